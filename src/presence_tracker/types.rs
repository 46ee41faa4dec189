//! Presence tracker data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Structured payload encoded into item QR codes
///
/// Wire format: `{"item_id": "...", "item_name": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQrData {
    pub item_id: String,
    pub item_name: String,
}

impl ItemQrData {
    pub fn new(item_id: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            item_name: item_name.into(),
        }
    }

    /// Parse a decoded payload; `None` for anything that is not item data
    pub fn parse(content: &str) -> Option<Self> {
        let data: Self = serde_json::from_str(content).ok()?;
        if data.item_id.is_empty() {
            return None;
        }
        Some(data)
    }
}

/// A QR code in the tracker's debounced visible set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCode {
    /// Raw payload, also the map key
    pub content: String,
    /// Parsed item identity, when the payload is item data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemQrData>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Missing from recent scans but still inside the grace period
    pub pending_removal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disappeared_at: Option<DateTime<Utc>>,
    /// Monotonic start of the grace period; `disappeared_at` is display only
    #[serde(skip)]
    pub(crate) pending_since: Option<Instant>,
}

impl DetectedCode {
    pub(crate) fn new(content: String, item: Option<ItemQrData>, now: DateTime<Utc>) -> Self {
        Self {
            content,
            item,
            first_seen: now,
            last_seen: now,
            pending_removal: false,
            disappeared_at: None,
            pending_since: None,
        }
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item.as_ref().map(|i| i.item_id.as_str())
    }

    pub fn item_name(&self) -> Option<&str> {
        self.item.as_ref().map(|i| i.item_name.as_str())
    }
}

/// Confirmed presence transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    /// Code seen for the first time (or again after a confirmed disappearance)
    Appeared {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        item: Option<ItemQrData>,
        at: DateTime<Utc>,
    },
    /// Code missing for at least the grace period
    Disappeared {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        item: Option<ItemQrData>,
        at: DateTime<Utc>,
    },
}

impl PresenceEvent {
    pub fn content(&self) -> &str {
        match self {
            PresenceEvent::Appeared { content, .. } | PresenceEvent::Disappeared { content, .. } => {
                content
            }
        }
    }

    pub fn item(&self) -> Option<&ItemQrData> {
        match self {
            PresenceEvent::Appeared { item, .. } | PresenceEvent::Disappeared { item, .. } => {
                item.as_ref()
            }
        }
    }

    pub fn is_appeared(&self) -> bool {
        matches!(self, PresenceEvent::Appeared { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_payload() {
        let data = ItemQrData::parse(r#"{"item_id":"apple-001","item_name":"Apple"}"#).unwrap();
        assert_eq!(data, ItemQrData::new("apple-001", "Apple"));
    }

    #[test]
    fn test_parse_plain_text_is_none() {
        assert!(ItemQrData::parse("https://example.com/shelf").is_none());
    }

    #[test]
    fn test_parse_requires_both_fields() {
        assert!(ItemQrData::parse(r#"{"item_id":"apple-001"}"#).is_none());
        assert!(ItemQrData::parse(r#"{"item_name":"Apple"}"#).is_none());
    }

    #[test]
    fn test_parse_rejects_empty_item_id() {
        assert!(ItemQrData::parse(r#"{"item_id":"","item_name":"Apple"}"#).is_none());
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let data =
            ItemQrData::parse(r#"{"item_id":"x","item_name":"X","batch":7}"#).unwrap();
        assert_eq!(data.item_id, "x");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = PresenceEvent::Appeared {
            content: "A".to_string(),
            item: None,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "appeared");
        assert_eq!(json["content"], "A");
        assert!(json.get("item").is_none());
    }
}
