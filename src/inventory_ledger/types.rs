//! Inventory ledger data types

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Item lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Item is on the shelf
    OnShelf,
    /// Item has been taken
    CheckedOut,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::OnShelf => "on_shelf",
            ItemState::CheckedOut => "checked_out",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_shelf" => Ok(ItemState::OnShelf),
            "checked_out" => Ok(ItemState::CheckedOut),
            other => Err(Error::Validation(format!(
                "state must be 'on_shelf' or 'checked_out', got: {}",
                other
            ))),
        }
    }
}

/// Inventory item entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,
    pub item_name: String,
    pub state: ItemState,
    /// Last transition into `on_shelf`
    pub checked_in_at: DateTime<Utc>,
    /// Last transition into `checked_out`; `None` while on the shelf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_out_at: Option<DateTime<Utc>>,
}

/// Result of a checkout/return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub item: InventoryItem,
    pub previous_state: ItemState,
}

/// Inventory listing with counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Items matching the filter, ordered by `item_id`
    pub items: Vec<InventoryItem>,
    /// Number of items returned
    pub total_count: usize,
    /// Ledger-wide counts, independent of the filter
    pub on_shelf_count: usize,
    pub checked_out_count: usize,
}
