//! Application state
//!
//! Holds all shared components and state

use crate::command_dispatcher::CommandDispatcher;
use crate::config::{env_number, KeeperConfig};
use crate::error::Result;
use crate::inventory_ledger::InventoryLedger;
use crate::presence_tracker::PresenceTracker;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Tracker / vision service settings
    pub keeper: KeeperConfig,
}

impl AppConfig {
    /// Read server settings and the keeper config from the environment
    pub fn load() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_number::<u16>("PORT")?.unwrap_or(8080),
            keeper: KeeperConfig::load()?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// PresenceTracker (debounced QR view)
    pub tracker: Arc<PresenceTracker>,
    /// InventoryLedger (item states)
    pub ledger: Arc<InventoryLedger>,
    /// CommandDispatcher (named actions)
    pub dispatcher: Arc<CommandDispatcher>,
}

impl AppState {
    pub fn new(tracker: Arc<PresenceTracker>, ledger: Arc<InventoryLedger>) -> Self {
        let dispatcher = Arc::new(CommandDispatcher::new(tracker.clone(), ledger.clone()));
        Self {
            tracker,
            ledger,
            dispatcher,
        }
    }
}
