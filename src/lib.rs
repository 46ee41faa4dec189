//! Shelf Keeper Library
//!
//! Watches a shelf camera for QR codes and keeps an inventory ledger of
//! which items are on the shelf and which are checked out.
//!
//! ## Components
//!
//! 1. PresenceTracker - Debounced QR appearance/disappearance
//! 2. InventoryLedger - on_shelf / checked_out item states
//! 3. AutoCheckin - Optional presence-driven ledger updates
//! 4. CommandDispatcher - Named request/response actions
//! 5. WebAPI - HTTP surface for the dispatcher
//!
//! Frame capture and QR decoding sit behind the `detector::QrDetector`
//! trait; the tracker and the ledger never lock each other.

pub mod auto_checkin;
pub mod command_dispatcher;
pub mod config;
pub mod detector;
pub mod error;
pub mod inventory_ledger;
pub mod models;
pub mod presence_tracker;
pub mod qr_generator;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
