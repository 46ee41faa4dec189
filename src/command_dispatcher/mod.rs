//! CommandDispatcher - Named Request/Response Actions
//!
//! ## Responsibilities
//!
//! - Decode raw JSON commands into typed `Command` values
//! - Route each command to the tracker, ledger, or QR generator
//! - Shape typed JSON responses
//!
//! No inventory or presence logic lives here.

use crate::error::{Error, Result};
use crate::inventory_ledger::{InventoryLedger, InventoryItem, ItemState, StateTransition};
use crate::presence_tracker::{DetectedCode, ItemQrData, PresenceEvent, PresenceTracker};
use crate::qr_generator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Typed command, tagged by the `command` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Health check
    Ping {},
    /// Echo back `message`
    Echo {
        #[serde(default)]
        message: Option<Value>,
    },
    /// Render a QR label for an item
    GenerateQr { item_id: String, item_name: String },
    AddItem { item_id: String, item_name: String },
    GetInventory {
        #[serde(default)]
        state: Option<ItemState>,
    },
    CheckoutItem { item_id: String },
    ReturnItem { item_id: String },
    RemoveItem { item_id: String },
    /// Current debounced view of the camera
    GetVisibleCodes {},
    /// Run one scan cycle immediately
    ScanNow {},
}

impl Command {
    /// Decode a raw command object
    pub fn decode(raw: Value) -> Result<Self> {
        match raw.get("command") {
            Some(Value::String(_)) => {}
            _ => {
                return Err(Error::Validation(
                    "command field is required and must be a string".to_string(),
                ))
            }
        }

        let command: Self =
            serde_json::from_value(raw).map_err(|e| Error::Validation(e.to_string()))?;
        command.validate()?;
        Ok(command)
    }

    /// Name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping {} => "ping",
            Command::Echo { .. } => "echo",
            Command::GenerateQr { .. } => "generate_qr",
            Command::AddItem { .. } => "add_item",
            Command::GetInventory { .. } => "get_inventory",
            Command::CheckoutItem { .. } => "checkout_item",
            Command::ReturnItem { .. } => "return_item",
            Command::RemoveItem { .. } => "remove_item",
            Command::GetVisibleCodes {} => "get_visible_codes",
            Command::ScanNow {} => "scan_now",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Command::GenerateQr { item_id, item_name } | Command::AddItem { item_id, item_name } => {
                require_non_empty("item_id", item_id)?;
                require_non_empty("item_name", item_name)
            }
            Command::CheckoutItem { item_id }
            | Command::ReturnItem { item_id }
            | Command::RemoveItem { item_id } => require_non_empty("item_id", item_id),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckoutResponse {
    item_id: String,
    item_name: String,
    state: ItemState,
    previous_state: ItemState,
    checked_out_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ReturnResponse {
    item_id: String,
    item_name: String,
    state: ItemState,
    previous_state: ItemState,
    checked_in_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct RemoveResponse {
    item_id: String,
    removed: bool,
}

#[derive(Debug, Serialize)]
struct VisibleCodesResponse {
    camera_name: String,
    count: usize,
    codes: Vec<DetectedCode>,
}

#[derive(Debug, Serialize)]
struct ScanResponse {
    events: Vec<PresenceEvent>,
    visible_count: usize,
}

/// CommandDispatcher instance
pub struct CommandDispatcher {
    tracker: Arc<PresenceTracker>,
    ledger: Arc<InventoryLedger>,
}

impl CommandDispatcher {
    pub fn new(tracker: Arc<PresenceTracker>, ledger: Arc<InventoryLedger>) -> Self {
        Self { tracker, ledger }
    }

    /// Decode and execute a raw command
    pub async fn do_command(&self, raw: Value) -> Result<Value> {
        let command = Command::decode(raw)?;
        self.execute(command).await
    }

    /// Execute a decoded command
    pub async fn execute(&self, command: Command) -> Result<Value> {
        tracing::debug!(command = command.name(), "Command received");

        match command {
            Command::Ping {} => Ok(serde_json::json!({
                "status": "ok",
                "message": "Inventory keeper is running!",
            })),
            Command::Echo { message } => Ok(serde_json::json!({
                "command": "echo",
                "message": message.unwrap_or_else(|| Value::from("no message provided")),
                "status": "success",
            })),
            Command::GenerateQr { item_id, item_name } => {
                let qr = qr_generator::generate(&ItemQrData::new(item_id, item_name))?;
                Ok(serde_json::to_value(qr)?)
            }
            Command::AddItem { item_id, item_name } => {
                let item: InventoryItem = self.ledger.add_item(&item_id, &item_name).await?;
                Ok(serde_json::to_value(item)?)
            }
            Command::GetInventory { state } => {
                let snapshot = self.ledger.get_inventory(state).await;
                Ok(serde_json::to_value(snapshot)?)
            }
            Command::CheckoutItem { item_id } => {
                let StateTransition {
                    item,
                    previous_state,
                } = self.ledger.checkout_item(&item_id).await?;
                Ok(serde_json::to_value(CheckoutResponse {
                    item_id: item.item_id,
                    item_name: item.item_name,
                    state: item.state,
                    previous_state,
                    checked_out_at: item.checked_out_at,
                })?)
            }
            Command::ReturnItem { item_id } => {
                let StateTransition {
                    item,
                    previous_state,
                } = self.ledger.return_item(&item_id).await?;
                Ok(serde_json::to_value(ReturnResponse {
                    item_id: item.item_id,
                    item_name: item.item_name,
                    state: item.state,
                    previous_state,
                    checked_in_at: item.checked_in_at,
                })?)
            }
            Command::RemoveItem { item_id } => {
                let removed = self.ledger.remove_item(&item_id).await?;
                Ok(serde_json::to_value(RemoveResponse {
                    item_id: removed.item_id,
                    removed: true,
                })?)
            }
            Command::GetVisibleCodes {} => {
                let codes = self.tracker.visible_codes().await;
                Ok(serde_json::to_value(VisibleCodesResponse {
                    camera_name: self.tracker.camera_name().to_string(),
                    count: codes.len(),
                    codes,
                })?)
            }
            Command::ScanNow {} => {
                let events = self.tracker.scan_once().await?;
                let visible_count = self.tracker.visible_codes().await.len();
                Ok(serde_json::to_value(ScanResponse {
                    events,
                    visible_count,
                })?)
            }
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!(
            "{} is required and must be a non-empty string",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerSettings;
    use crate::detector::{Detection, QrDetector};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct FixedDetector(Vec<&'static str>);

    #[async_trait]
    impl QrDetector for FixedDetector {
        async fn detections_from_camera(&self, _camera_name: &str) -> Result<Vec<Detection>> {
            Ok(self.0.iter().map(|l| Detection::new(*l)).collect())
        }
    }

    fn dispatcher_with(labels: Vec<&'static str>) -> CommandDispatcher {
        let settings = TrackerSettings {
            scan_interval: None,
            grace_period: Duration::from_millis(200),
        };
        let tracker = Arc::new(PresenceTracker::new(
            "test-camera",
            Arc::new(FixedDetector(labels)),
            settings,
        ));
        CommandDispatcher::new(tracker, Arc::new(InventoryLedger::new()))
    }

    fn dispatcher() -> CommandDispatcher {
        dispatcher_with(Vec::new())
    }

    fn recent(value: &Value) -> bool {
        let parsed = DateTime::parse_from_rfc3339(value.as_str().unwrap()).unwrap();
        (Utc::now() - parsed.with_timezone(&Utc)).num_seconds() < 5
    }

    #[test]
    fn test_decode_requires_command_field() {
        assert!(matches!(
            Command::decode(json!({"item_id": "x"})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            Command::decode(json!({"command": 5})),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_decode_unknown_command() {
        let err = Command::decode(json!({"command": "self_destruct"})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_decode_typed_fields() {
        assert_eq!(
            Command::decode(json!({"command": "get_inventory", "state": "checked_out"})).unwrap(),
            Command::GetInventory {
                state: Some(ItemState::CheckedOut)
            }
        );
        assert!(Command::decode(json!({"command": "get_inventory", "state": "lost"})).is_err());
        assert!(Command::decode(json!({"command": "checkout_item", "item_id": 7})).is_err());
        assert!(Command::decode(json!({"command": "ping", "extra": true})).is_ok());
    }

    #[tokio::test]
    async fn test_ping_and_echo() {
        let d = dispatcher();
        let pong = d.do_command(json!({"command": "ping"})).await.unwrap();
        assert_eq!(pong["status"], "ok");

        let echo = d
            .do_command(json!({"command": "echo", "message": "hello"}))
            .await
            .unwrap();
        assert_eq!(echo, json!({"command": "echo", "message": "hello", "status": "success"}));

        let empty = d.do_command(json!({"command": "echo"})).await.unwrap();
        assert_eq!(empty["message"], "no message provided");
    }

    #[tokio::test]
    async fn test_generate_qr() {
        let d = dispatcher();
        let result = d
            .do_command(json!({"command": "generate_qr", "item_id": "item-001", "item_name": "Apple"}))
            .await
            .unwrap();
        assert_eq!(result["item_id"], "item-001");
        assert_eq!(result["item_name"], "Apple");
        assert_eq!(result["format"], "base64-png");
        assert!(!result["qr_code"].as_str().unwrap().is_empty());

        for bad in [
            json!({"command": "generate_qr", "item_name": "Apple"}),
            json!({"command": "generate_qr", "item_id": "", "item_name": "Apple"}),
            json!({"command": "generate_qr", "item_id": "item-001"}),
        ] {
            assert!(matches!(d.do_command(bad).await, Err(Error::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_add_item_response() {
        let d = dispatcher();
        let mut result = d
            .do_command(json!({"command": "add_item", "item_id": "test-001", "item_name": "Test Item"}))
            .await
            .unwrap();
        assert!(recent(&result["checked_in_at"]));

        result.as_object_mut().unwrap().remove("checked_in_at");
        assert_eq!(
            result,
            json!({"item_id": "test-001", "item_name": "Test Item", "state": "on_shelf"})
        );

        let dup = d
            .do_command(json!({"command": "add_item", "item_id": "test-001", "item_name": "Dup"}))
            .await;
        assert!(matches!(dup, Err(Error::Conflict(_))));

        let missing = d
            .do_command(json!({"command": "add_item", "item_name": "No ID"}))
            .await;
        assert!(matches!(missing, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_inventory_scenario() {
        let d = dispatcher();
        d.do_command(json!({"command": "add_item", "item_id": "apple-001", "item_name": "Apple"}))
            .await
            .unwrap();

        let inventory = d.do_command(json!({"command": "get_inventory"})).await.unwrap();
        assert_eq!(inventory["total_count"], 1);
        assert_eq!(inventory["on_shelf_count"], 1);
        assert_eq!(inventory["checked_out_count"], 0);

        let mut checkout = d
            .do_command(json!({"command": "checkout_item", "item_id": "apple-001"}))
            .await
            .unwrap();
        assert!(recent(&checkout["checked_out_at"]));
        checkout.as_object_mut().unwrap().remove("checked_out_at");
        assert_eq!(
            checkout,
            json!({
                "item_id": "apple-001",
                "item_name": "Apple",
                "state": "checked_out",
                "previous_state": "on_shelf",
            })
        );

        let checked_out = d
            .do_command(json!({"command": "get_inventory", "state": "checked_out"}))
            .await
            .unwrap();
        let items = checked_out["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["item_id"], "apple-001");
        assert_eq!(checked_out["total_count"], 1);

        let mut returned = d
            .do_command(json!({"command": "return_item", "item_id": "apple-001"}))
            .await
            .unwrap();
        assert!(recent(&returned["checked_in_at"]));
        returned.as_object_mut().unwrap().remove("checked_in_at");
        assert_eq!(
            returned,
            json!({
                "item_id": "apple-001",
                "item_name": "Apple",
                "state": "on_shelf",
                "previous_state": "checked_out",
            })
        );

        let removed = d
            .do_command(json!({"command": "remove_item", "item_id": "apple-001"}))
            .await
            .unwrap();
        assert_eq!(removed, json!({"item_id": "apple-001", "removed": true}));

        let after = d
            .do_command(json!({"command": "checkout_item", "item_id": "apple-001"}))
            .await;
        assert!(matches!(after, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_not_found_commands() {
        let d = dispatcher();
        for command in ["checkout_item", "return_item", "remove_item"] {
            let result = d
                .do_command(json!({"command": command, "item_id": "does-not-exist"}))
                .await;
            assert!(matches!(result, Err(Error::NotFound(_))), "{}", command);
        }
    }

    #[tokio::test]
    async fn test_scan_now_and_visible_codes() {
        let d = dispatcher_with(vec![r#"{"item_id":"apple-001","item_name":"Apple"}"#, "loose-label"]);

        let scan = d.do_command(json!({"command": "scan_now"})).await.unwrap();
        assert_eq!(scan["visible_count"], 2);
        assert_eq!(scan["events"].as_array().unwrap().len(), 2);

        let visible = d
            .do_command(json!({"command": "get_visible_codes"}))
            .await
            .unwrap();
        assert_eq!(visible["camera_name"], "test-camera");
        assert_eq!(visible["count"], 2);
        let codes = visible["codes"].as_array().unwrap();
        // Ordered by content: "l" sorts before "{"
        assert_eq!(codes[0]["content"], "loose-label");
        assert_eq!(codes[1]["item"]["item_id"], "apple-001");
    }
}
