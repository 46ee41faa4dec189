//! Shared models and types
//!
//! Response envelopes used by the web API.

use serde::{Deserialize, Serialize};

/// Standard API response wrapper
///
/// Failures are rendered by `Error`'s `IntoResponse` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub camera_name: String,
    pub monitoring: bool,
    pub visible_codes: usize,
    pub inventory_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(3)).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "data": 3}));
    }
}
