//! Keeper configuration
//!
//! Construction-time settings for the presence tracker and the vision
//! service it polls. Loaded from a JSON file (`KEEPER_CONFIG_FILE`) or from
//! environment variables.
//!
//! ## Tri-state durations
//!
//! `scan_interval_ms` and `grace_period_ms` distinguish "unset" from zero:
//!
//! | value | scan_interval_ms | grace_period_ms |
//! |-------|------------------|-----------------|
//! | unset | 1000ms           | 2000ms          |
//! | 0     | polling disabled | immediate removal |
//! | > 0   | custom           | custom          |
//! | < 0   | validation error | validation error |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default poll cadence when `scan_interval_ms` is unset
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 1000;

/// Default debounce window when `grace_period_ms` is unset
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2000;

/// Default bound on a single vision service call
pub const DEFAULT_DETECTOR_TIMEOUT_MS: u64 = 5000;

/// Keeper configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Camera watching the shelf
    #[serde(default)]
    pub camera_name: String,

    /// Base URL of the QR vision service
    #[serde(default)]
    pub qr_vision_service: String,

    /// Scan interval in milliseconds (see module docs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval_ms: Option<i64>,

    /// Grace period in milliseconds (see module docs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_ms: Option<i64>,

    /// Drive check-in/check-out from presence events
    #[serde(default)]
    pub auto_checkin: bool,

    /// Timeout for a single detector call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_timeout_ms: Option<u64>,
}

/// Resolved tracker timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// `None` means background polling is disabled
    pub scan_interval: Option<Duration>,
    /// Zero means codes are removed on the first scan that misses them
    pub grace_period: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            scan_interval: Some(Duration::from_millis(DEFAULT_SCAN_INTERVAL_MS)),
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
        }
    }
}

impl KeeperConfig {
    /// Create a config with required fields and default timings
    pub fn new(camera_name: impl Into<String>, qr_vision_service: impl Into<String>) -> Self {
        Self {
            camera_name: camera_name.into(),
            qr_vision_service: qr_vision_service.into(),
            ..Default::default()
        }
    }

    /// Load from `KEEPER_CONFIG_FILE` if set, otherwise from the environment
    pub fn load() -> Result<Self> {
        match std::env::var("KEEPER_CONFIG_FILE") {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    /// Parse a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded keeper config file");
        Ok(config)
    }

    /// Read fields from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            camera_name: std::env::var("CAMERA_NAME").unwrap_or_default(),
            qr_vision_service: std::env::var("QR_VISION_SERVICE").unwrap_or_default(),
            scan_interval_ms: env_number("SCAN_INTERVAL_MS")?,
            grace_period_ms: env_number("GRACE_PERIOD_MS")?,
            auto_checkin: env_flag("AUTO_CHECKIN")?.unwrap_or(false),
            detector_timeout_ms: env_number("DETECTOR_TIMEOUT_MS")?,
        })
    }

    /// Check required fields and duration ranges
    pub fn validate(&self) -> Result<()> {
        if self.camera_name.trim().is_empty() {
            return Err(Error::Validation("camera_name is required".to_string()));
        }
        if self.qr_vision_service.trim().is_empty() {
            return Err(Error::Validation(
                "qr_vision_service is required".to_string(),
            ));
        }
        if let Some(ms) = self.scan_interval_ms {
            if ms < 0 {
                return Err(Error::Validation(format!(
                    "scan_interval_ms must be non-negative, got: {}",
                    ms
                )));
            }
        }
        if let Some(ms) = self.grace_period_ms {
            if ms < 0 {
                return Err(Error::Validation(format!(
                    "grace_period_ms must be non-negative, got: {}",
                    ms
                )));
            }
        }
        Ok(())
    }

    /// Validate and resolve the tri-state timings
    pub fn tracker_settings(&self) -> Result<TrackerSettings> {
        self.validate()?;

        let scan_interval = match self.scan_interval_ms {
            None => Some(Duration::from_millis(DEFAULT_SCAN_INTERVAL_MS)),
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms.unsigned_abs())),
        };
        let grace_period = match self.grace_period_ms {
            None => Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
            Some(ms) => Duration::from_millis(ms.unsigned_abs()),
        };

        Ok(TrackerSettings {
            scan_interval,
            grace_period,
        })
    }

    /// Detector call timeout
    pub fn detector_timeout(&self) -> Duration {
        Duration::from_millis(
            self.detector_timeout_ms
                .unwrap_or(DEFAULT_DETECTOR_TIMEOUT_MS),
        )
    }
}

pub(crate) fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be an integer, got: {}", key, raw))),
        _ => Ok(None),
    }
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_flag(key, &raw).map(Some),
        _ => Ok(None),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be a boolean, got: {}",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> KeeperConfig {
        KeeperConfig::new("shelf-camera", "http://localhost:9000")
    }

    #[test]
    fn test_valid_config() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_missing_camera_name_rejected() {
        let config = KeeperConfig {
            camera_name: String::new(),
            ..base()
        };
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_missing_vision_service_rejected() {
        let config = KeeperConfig {
            qr_vision_service: "  ".to_string(),
            ..base()
        };
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_negative_scan_interval_rejected() {
        let config = KeeperConfig {
            scan_interval_ms: Some(-100),
            ..base()
        };
        let err = config.tracker_settings().unwrap_err();
        assert!(err.to_string().contains("scan_interval_ms"));
    }

    #[test]
    fn test_negative_grace_period_rejected() {
        let config = KeeperConfig {
            grace_period_ms: Some(-100),
            ..base()
        };
        let err = config.tracker_settings().unwrap_err();
        assert!(err.to_string().contains("grace_period_ms"));
    }

    #[test]
    fn test_unset_timings_use_defaults() {
        let settings = base().tracker_settings().unwrap();
        assert_eq!(settings, TrackerSettings::default());
        assert_eq!(settings.scan_interval, Some(Duration::from_millis(1000)));
        assert_eq!(settings.grace_period, Duration::from_millis(2000));
    }

    #[test]
    fn test_zero_timings() {
        let config = KeeperConfig {
            scan_interval_ms: Some(0),
            grace_period_ms: Some(0),
            ..base()
        };
        let settings = config.tracker_settings().unwrap();
        assert_eq!(settings.scan_interval, None);
        assert_eq!(settings.grace_period, Duration::ZERO);
    }

    #[test]
    fn test_custom_timings() {
        let config = KeeperConfig {
            scan_interval_ms: Some(250),
            grace_period_ms: Some(500),
            ..base()
        };
        let settings = config.tracker_settings().unwrap();
        assert_eq!(settings.scan_interval, Some(Duration::from_millis(250)));
        assert_eq!(settings.grace_period, Duration::from_millis(500));
    }

    #[test]
    fn test_deserialize_keeps_unset_distinct_from_zero() {
        let config: KeeperConfig = serde_json::from_str(
            r#"{"camera_name":"cam","qr_vision_service":"http://vision","scan_interval_ms":0}"#,
        )
        .unwrap();
        assert_eq!(config.scan_interval_ms, Some(0));
        assert_eq!(config.grace_period_ms, None);
        assert!(!config.auto_checkin);
    }

    #[test]
    fn test_flag_values() {
        assert!(parse_flag("AUTO_CHECKIN", "TRUE").unwrap());
        assert!(parse_flag("AUTO_CHECKIN", " 1 ").unwrap());
        assert!(!parse_flag("AUTO_CHECKIN", "off").unwrap());
        assert!(matches!(
            parse_flag("AUTO_CHECKIN", "sometimes"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_malformed_numbers_rejected() {
        std::env::set_var("SHELF_KEEPER_TEST_BAD_PORT", "80a");
        let result = env_number::<u16>("SHELF_KEEPER_TEST_BAD_PORT");
        assert!(matches!(result, Err(Error::Config(_))));

        std::env::set_var("SHELF_KEEPER_TEST_BIG_PORT", "70000");
        let result = env_number::<u16>("SHELF_KEEPER_TEST_BIG_PORT");
        assert!(matches!(result, Err(Error::Config(_))));

        assert_eq!(env_number::<u16>("SHELF_KEEPER_TEST_UNSET_PORT").unwrap(), None);
    }

    #[test]
    fn test_detector_timeout_default() {
        assert_eq!(base().detector_timeout(), Duration::from_millis(5000));
    }
}
