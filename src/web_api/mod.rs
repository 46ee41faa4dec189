//! WebAPI - HTTP Surface
//!
//! ## Responsibilities
//!
//! - Expose the command dispatcher over HTTP
//! - Read-only views of inventory and presence
//! - Health/status endpoints

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        camera_name: state.tracker.camera_name().to_string(),
        monitoring: state.tracker.is_running().await,
        visible_codes: state.tracker.visible_codes().await.len(),
        inventory_items: state.ledger.len().await,
    };

    Json(response)
}

/// Status endpoint
pub async fn device_status(State(_state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "device_type": "shelf-keeper",
        "firmware_version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
