//! PresenceTracker - Debounced QR Code Presence
//!
//! ## Responsibilities
//!
//! - Poll the QR detector for the shelf camera at a fixed cadence
//! - Maintain the debounced set of currently visible payloads
//! - Emit appearance/disappearance events only for confirmed transitions
//!
//! ## Debounce rules (per payload, independent of every other payload)
//!
//! - New payload: inserted, `Appeared` emitted
//! - Seen again while pending removal: pending flag and timer fully reset
//! - Missing, grace period zero: removed, `Disappeared` emitted
//! - Missing, first miss: marked pending removal, no event
//! - Missing, already pending for >= grace period: removed, `Disappeared` emitted
//!
//! A failed detector call aborts the cycle before the visible set is touched.

mod types;

pub use types::{DetectedCode, ItemQrData, PresenceEvent};

use crate::config::TrackerSettings;
use crate::detector::{Detection, QrDetector};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// PresenceTracker instance
pub struct PresenceTracker {
    camera_name: String,
    detector: Arc<dyn QrDetector>,
    settings: TrackerSettings,
    /// Keyed by payload content
    visible_codes: Mutex<HashMap<String, DetectedCode>>,
    events: broadcast::Sender<PresenceEvent>,
    /// Flipped to `true` once; never reset
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceTracker {
    /// Create new PresenceTracker (monitoring not started)
    pub fn new(
        camera_name: impl Into<String>,
        detector: Arc<dyn QrDetector>,
        settings: TrackerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = watch::channel(false);

        Self {
            camera_name: camera_name.into(),
            detector,
            settings,
            visible_codes: Mutex::new(HashMap::new()),
            events,
            shutdown,
            task: Mutex::new(None),
        }
    }

    pub fn camera_name(&self) -> &str {
        &self.camera_name
    }

    /// Subscribe to confirmed presence events
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.events.subscribe()
    }

    /// Start the background scan loop
    ///
    /// Returns `false` without spawning when polling is disabled, the loop is
    /// already running, or the tracker has been stopped.
    pub async fn start(self: &Arc<Self>) -> bool {
        let Some(period) = self.settings.scan_interval else {
            tracing::info!("QR code monitoring explicitly disabled (scan_interval_ms=0)");
            return false;
        };

        let stopped = *self.shutdown.borrow();
        if stopped {
            tracing::warn!("QR code monitoring already stopped; not restarting");
            return false;
        }

        let mut task = self.task.lock().await;
        if task.is_some() {
            tracing::warn!("QR code monitoring already running");
            return false;
        }

        tracing::info!(
            camera = %self.camera_name,
            interval_ms = period.as_millis() as u64,
            grace_period_ms = self.settings.grace_period.as_millis() as u64,
            "Starting QR code monitoring"
        );

        let tracker = Arc::clone(self);
        let shutdown = self.shutdown.subscribe();
        *task = Some(tokio::spawn(async move {
            tracker.run(period, shutdown).await;
        }));

        true
    }

    /// Stop the background scan loop and wait for it to exit
    ///
    /// Idempotent. No scan starts after this is called; a detector call in
    /// flight is abandoned without touching the visible set.
    pub async fn stop(&self) {
        let was_stopped = self.shutdown.send_replace(true);
        let handle = self.task.lock().await.take();

        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "QR code monitoring task ended abnormally");
                }
                tracing::info!(camera = %self.camera_name, "QR code monitoring stopped");
            }
            None if !was_stopped => {
                tracing::debug!("Tracker stopped with no monitoring task");
            }
            None => {}
        }
    }

    /// Whether the background loop is currently running
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Run exactly one poll-compare-update cycle
    pub async fn scan_once(&self) -> Result<Vec<PresenceEvent>> {
        let detections = self.fetch_detections().await?;
        Ok(self.apply_detections(detections).await)
    }

    /// Snapshot of the debounced visible set, ordered by content
    pub async fn visible_codes(&self) -> Vec<DetectedCode> {
        let visible = self.visible_codes.lock().await;
        let mut codes: Vec<DetectedCode> = visible.values().cloned().collect();
        codes.sort_by(|a, b| a.content.cmp(&b.content));
        codes
    }

    /// Look up a single visible code
    pub async fn get_code(&self, content: &str) -> Option<DetectedCode> {
        self.visible_codes.lock().await.get(content).cloned()
    }

    async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let stopped = *shutdown.borrow();
            if stopped {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Errors are already logged; the next tick retries.
                    let _ = self.scan_until_stopped(&mut shutdown).await;
                }
            }
        }

        tracing::debug!(camera = %self.camera_name, "QR code monitoring loop exited");
    }

    async fn scan_until_stopped(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Vec<PresenceEvent>> {
        let detections = tokio::select! {
            result = self.fetch_detections() => result?,
            _ = shutdown.changed() => {
                tracing::debug!("Scan abandoned: tracker stopping");
                return Err(Error::Cancelled("tracker stopping".to_string()));
            }
        };
        Ok(self.apply_detections(detections).await)
    }

    async fn fetch_detections(&self) -> Result<Vec<Detection>> {
        self.detector
            .detections_from_camera(&self.camera_name)
            .await
            .map_err(|e| {
                tracing::warn!(
                    camera = %self.camera_name,
                    error = %e,
                    "Failed to scan QR codes"
                );
                e
            })
    }

    /// Diff one cycle's detections against the visible set
    ///
    /// Holds the visible-set lock for the whole update, including event
    /// publication, so concurrent scans publish in the order they applied.
    /// The scan time is read after the lock is taken so it never runs
    /// backwards between scans.
    async fn apply_detections(&self, detections: Vec<Detection>) -> Vec<PresenceEvent> {
        let mut visible = self.visible_codes.lock().await;
        self.apply_locked(&mut visible, detections, ScanTime::now())
    }

    #[cfg(test)]
    async fn apply_detections_at(
        &self,
        detections: Vec<Detection>,
        at: ScanTime,
    ) -> Vec<PresenceEvent> {
        let mut visible = self.visible_codes.lock().await;
        self.apply_locked(&mut visible, detections, at)
    }

    fn apply_locked(
        &self,
        visible: &mut HashMap<String, DetectedCode>,
        detections: Vec<Detection>,
        at: ScanTime,
    ) -> Vec<PresenceEvent> {
        let now = at.wall;
        let mut events = Vec::new();
        let mut current: HashSet<String> = HashSet::with_capacity(detections.len());

        // Presence first, so a payload seen this cycle is never also evaluated as missing.
        for detection in detections {
            let content = detection.label;
            if !current.insert(content.clone()) {
                continue;
            }

            match visible.get_mut(&content) {
                Some(code) => {
                    code.last_seen = now;
                    if code.pending_removal {
                        code.pending_removal = false;
                        code.disappeared_at = None;
                        code.pending_since = None;
                        tracing::debug!(
                            content = %content,
                            "QR code reappeared within grace period"
                        );
                    }
                }
                None => {
                    let item = ItemQrData::parse(&content);
                    match &item {
                        Some(item) => tracing::info!(
                            item_id = %item.item_id,
                            item_name = %item.item_name,
                            confidence = detection.confidence,
                            width = detection.bbox.width(),
                            height = detection.bbox.height(),
                            "QR code appeared"
                        ),
                        None => tracing::info!(
                            content = %content,
                            confidence = detection.confidence,
                            width = detection.bbox.width(),
                            height = detection.bbox.height(),
                            "QR code appeared: unknown content"
                        ),
                    }
                    events.push(PresenceEvent::Appeared {
                        content: content.clone(),
                        item: item.clone(),
                        at: now,
                    });
                    visible.insert(content.clone(), DetectedCode::new(content, item, now));
                }
            }
        }

        let grace_period = self.settings.grace_period;
        let mut gone = Vec::new();
        for (content, code) in visible.iter_mut() {
            if current.contains(content) {
                continue;
            }

            if grace_period.is_zero() {
                gone.push(content.clone());
            } else if !code.pending_removal {
                code.pending_removal = true;
                code.disappeared_at = Some(now);
                code.pending_since = Some(at.mono);
                tracing::debug!(content = %content, "QR code missing, grace period started");
            } else if grace_elapsed(code.pending_since, at.mono, grace_period) {
                gone.push(content.clone());
            }
        }

        gone.sort();
        for content in gone {
            if let Some(code) = visible.remove(&content) {
                match &code.item {
                    Some(item) => tracing::info!(
                        item_id = %item.item_id,
                        item_name = %item.item_name,
                        "QR code disappeared"
                    ),
                    None => tracing::info!(
                        content = %content,
                        "QR code disappeared: unknown content"
                    ),
                }
                events.push(PresenceEvent::Disappeared {
                    content,
                    item: code.item,
                    at: now,
                });
            }
        }

        for event in &events {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }

        events
    }
}

/// Wall-clock stamp for display plus monotonic reading for the grace timer
#[derive(Debug, Clone, Copy)]
struct ScanTime {
    wall: DateTime<Utc>,
    mono: Instant,
}

impl ScanTime {
    fn now() -> Self {
        Self {
            wall: Utc::now(),
            mono: Instant::now(),
        }
    }
}

fn grace_elapsed(pending_since: Option<Instant>, now: Instant, grace_period: Duration) -> bool {
    match pending_since {
        Some(since) => now.saturating_duration_since(since) >= grace_period,
        None => true,
    }
}
