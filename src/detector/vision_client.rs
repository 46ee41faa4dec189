//! VisionClient - HTTP adapter for the QR vision service
//!
//! `GET {base_url}/v1/detections?camera={camera_name}` returns
//! `{"detections": [{"label": "...", "bbox": {...}, "confidence": 0.97}]}`.

use super::{Detection, QrDetector};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Vision service client
pub struct VisionClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DetectionsResponse {
    #[serde(default)]
    detections: Vec<Detection>,
}

impl VisionClient {
    /// Create new client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check vision service health
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl QrDetector for VisionClient {
    async fn detections_from_camera(&self, camera_name: &str) -> Result<Vec<Detection>> {
        let url = format!("{}/v1/detections", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("camera", camera_name)])
            .send()
            .await
            .map_err(|e| Error::Detector(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Detector(format!(
                "vision service returned {}",
                resp.status()
            )));
        }

        let body: DetectionsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Detector(format!("invalid response body: {}", e)))?;

        tracing::trace!(
            camera = %camera_name,
            count = body.detections.len(),
            "Detections received"
        );

        Ok(body.detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = VisionClient::new("http://vision:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://vision:9000");
    }

    #[test]
    fn test_response_parsing() {
        let body: DetectionsResponse = serde_json::from_str(
            r#"{"detections":[{"label":"A","bbox":{"x_min":1,"y_min":2,"x_max":3,"y_max":4},"confidence":0.9}]}"#,
        )
        .unwrap();
        assert_eq!(body.detections.len(), 1);
        assert_eq!(body.detections[0].label, "A");
        assert_eq!(body.detections[0].bbox.x_max, 3);
    }

    #[test]
    fn test_empty_response_parsing() {
        let body: DetectionsResponse = serde_json::from_str("{}").unwrap();
        assert!(body.detections.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_detector_error() {
        let client =
            VisionClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let result = client.detections_from_camera("cam").await;
        assert!(matches!(result, Err(Error::Detector(_))));
    }
}
