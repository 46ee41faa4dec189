//! AutoCheckin - Presence-Driven Ledger Updates
//!
//! Optional coupling between the presence tracker and the inventory ledger:
//!
//! - Confirmed appearance of a known item that is checked out -> returned
//! - Confirmed disappearance of a known item that is on the shelf -> checked out
//! - Unidentified payloads and unknown item IDs -> logged, ledger untouched
//!
//! Both components stay usable on their own; this module only consumes the
//! tracker's event stream and calls the ledger's public operations.

use crate::error::Error;
use crate::inventory_ledger::{InventoryLedger, StateTransition};
use crate::presence_tracker::PresenceEvent;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// AutoCheckin instance
pub struct AutoCheckin {
    ledger: Arc<InventoryLedger>,
}

impl AutoCheckin {
    pub fn new(ledger: Arc<InventoryLedger>) -> Self {
        Self { ledger }
    }

    /// Apply one presence event to the ledger
    ///
    /// Returns the transition performed, if any.
    pub async fn handle_event(&self, event: &PresenceEvent) -> Option<StateTransition> {
        let Some(item) = event.item() else {
            tracing::debug!(content = %event.content(), "Ignoring unidentified QR code");
            return None;
        };

        let on_shelf = event.is_appeared();
        match self.ledger.reconcile_presence(&item.item_id, on_shelf).await {
            Ok(Some(transition)) => {
                tracing::info!(
                    item_id = %item.item_id,
                    previous_state = %transition.previous_state,
                    state = %transition.item.state,
                    "Inventory updated from camera"
                );
                Some(transition)
            }
            Ok(None) => None,
            Err(Error::NotFound(_)) => {
                tracing::info!(
                    item_id = %item.item_id,
                    item_name = %item.item_name,
                    "QR code for item not in inventory; ignoring"
                );
                None
            }
            Err(e) => {
                tracing::warn!(item_id = %item.item_id, error = %e, "Auto check-in failed");
                None
            }
        }
    }

    /// Consume events until the tracker's channel closes
    pub fn spawn(self, mut events: broadcast::Receiver<PresenceEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Auto check-in enabled");
            loop {
                match events.recv().await {
                    Ok(event) => {
                        self.handle_event(&event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Auto check-in lagged behind presence events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Auto check-in stopped");
        })
    }
}
