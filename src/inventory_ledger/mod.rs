//! InventoryLedger - Shelf Item State Store
//!
//! ## Responsibilities
//!
//! - Authoritative in-memory record of items keyed by `item_id`
//! - Explicit on_shelf / checked_out transitions with timestamps
//! - Atomic mutations under a single reader/writer lock
//!
//! Checkout and return are idempotent: repeating one refreshes its
//! timestamp and reports the state the item was in before the call.

mod types;

pub use types::{InventoryItem, InventorySnapshot, ItemState, StateTransition};

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// InventoryLedger instance
pub struct InventoryLedger {
    items: RwLock<HashMap<String, InventoryItem>>,
}

impl InventoryLedger {
    /// Create empty ledger
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Add a new item, placed on the shelf
    pub async fn add_item(&self, item_id: &str, item_name: &str) -> Result<InventoryItem> {
        require_non_empty("item_id", item_id)?;
        require_non_empty("item_name", item_name)?;

        let mut items = self.items.write().await;
        if items.contains_key(item_id) {
            return Err(Error::Conflict(format!("item already exists: {}", item_id)));
        }

        let item = InventoryItem {
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            state: ItemState::OnShelf,
            checked_in_at: Utc::now(),
            checked_out_at: None,
        };
        items.insert(item_id.to_string(), item.clone());

        tracing::info!(item_id = %item_id, item_name = %item_name, "Item added to inventory");
        Ok(item)
    }

    /// Get a single item
    pub async fn get_item(&self, item_id: &str) -> Result<InventoryItem> {
        self.items
            .read()
            .await
            .get(item_id)
            .cloned()
            .ok_or_else(|| not_found(item_id))
    }

    /// List items, optionally restricted to one state
    pub async fn get_inventory(&self, state: Option<ItemState>) -> InventorySnapshot {
        let items = self.items.read().await;

        let mut on_shelf_count = 0;
        let mut checked_out_count = 0;
        for item in items.values() {
            match item.state {
                ItemState::OnShelf => on_shelf_count += 1,
                ItemState::CheckedOut => checked_out_count += 1,
            }
        }

        let mut listed: Vec<InventoryItem> = items
            .values()
            .filter(|item| state.map_or(true, |s| item.state == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.item_id.cmp(&b.item_id));

        InventorySnapshot {
            total_count: listed.len(),
            items: listed,
            on_shelf_count,
            checked_out_count,
        }
    }

    /// Mark an item as taken off the shelf
    pub async fn checkout_item(&self, item_id: &str) -> Result<StateTransition> {
        let transition = self.transition(item_id, ItemState::CheckedOut).await?;
        tracing::info!(
            item_id = %item_id,
            previous_state = %transition.previous_state,
            "Item checked out"
        );
        Ok(transition)
    }

    /// Mark an item as back on the shelf
    pub async fn return_item(&self, item_id: &str) -> Result<StateTransition> {
        let transition = self.transition(item_id, ItemState::OnShelf).await?;
        tracing::info!(
            item_id = %item_id,
            previous_state = %transition.previous_state,
            "Item returned"
        );
        Ok(transition)
    }

    /// Delete an item regardless of its state
    pub async fn remove_item(&self, item_id: &str) -> Result<InventoryItem> {
        let removed = self
            .items
            .write()
            .await
            .remove(item_id)
            .ok_or_else(|| not_found(item_id))?;

        tracing::info!(item_id = %item_id, state = %removed.state, "Item removed from inventory");
        Ok(removed)
    }

    /// Align an item with what the camera sees
    ///
    /// Transitions only when the item's state disagrees with `on_shelf`;
    /// returns `None` when it already agrees. The check and the update
    /// happen under one write lock.
    pub async fn reconcile_presence(
        &self,
        item_id: &str,
        on_shelf: bool,
    ) -> Result<Option<StateTransition>> {
        let target = if on_shelf {
            ItemState::OnShelf
        } else {
            ItemState::CheckedOut
        };

        let mut items = self.items.write().await;
        let item = items.get_mut(item_id).ok_or_else(|| not_found(item_id))?;
        if item.state == target {
            return Ok(None);
        }

        Ok(Some(apply_transition(item, target, Utc::now())))
    }

    /// Number of items in the ledger
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    async fn transition(&self, item_id: &str, target: ItemState) -> Result<StateTransition> {
        let mut items = self.items.write().await;
        let item = items.get_mut(item_id).ok_or_else(|| not_found(item_id))?;
        Ok(apply_transition(item, target, Utc::now()))
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_transition(
    item: &mut InventoryItem,
    target: ItemState,
    now: DateTime<Utc>,
) -> StateTransition {
    let previous_state = item.state;
    match target {
        ItemState::CheckedOut => {
            item.checked_out_at = Some(strictly_after(item.checked_out_at, now));
        }
        ItemState::OnShelf => {
            item.checked_in_at = strictly_after(Some(item.checked_in_at), now);
            item.checked_out_at = None;
        }
    }
    item.state = target;

    StateTransition {
        item: item.clone(),
        previous_state,
    }
}

/// `now`, nudged forward if the clock has not moved past `previous`
fn strictly_after(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
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

fn not_found(item_id: &str) -> Error {
    Error::NotFound(format!("item not found: {}", item_id))
}
