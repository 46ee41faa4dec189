//! API Routes

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::inventory_ledger::ItemState;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::device_status))
        // Commands
        .route("/api/command", post(do_command))
        // Read-only views
        .route("/api/inventory", get(get_inventory))
        .route("/api/presence", get(get_presence))
        .with_state(state)
}

// ========================================
// Command Handlers
// ========================================

async fn do_command(State(state): State<AppState>, Json(raw): Json<Value>) -> impl IntoResponse {
    match state.dispatcher.do_command(raw).await {
        Ok(result) => Json(ApiResponse::success(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

// ========================================
// View Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct InventoryQuery {
    state: Option<String>,
}

async fn get_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> impl IntoResponse {
    let filter = match query.state.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<ItemState>() {
            Ok(s) => Some(s),
            Err(e) => return e.into_response(),
        },
    };

    let snapshot = state.ledger.get_inventory(filter).await;
    Json(ApiResponse::success(snapshot)).into_response()
}

async fn get_presence(State(state): State<AppState>) -> impl IntoResponse {
    let codes = state.tracker.visible_codes().await;
    Json(ApiResponse::success(codes))
}
