//! Detector - QR Vision Service Seam
//!
//! ## Responsibilities
//!
//! - Define the detection result shape (payload, bounding box, confidence)
//! - Abstract "decode every QR code the camera currently sees"
//! - Provide the HTTP adapter for a remote vision service
//!
//! Frame capture and QR decoding both live behind the vision service; the
//! tracker only names the camera it wants detections for.

mod vision_client;

pub use vision_client::VisionClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Pixel-space bounding box of a detected code
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    pub fn width(&self) -> i32 {
        (self.x_max - self.x_min).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y_max - self.y_min).max(0)
    }
}

/// A single decoded QR code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Decoded text payload
    pub label: String,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bbox: BoundingBox::default(),
            confidence: 1.0,
        }
    }
}

/// Source of QR detections for a named camera
#[async_trait]
pub trait QrDetector: Send + Sync {
    /// Return every code currently visible to `camera_name`
    async fn detections_from_camera(&self, camera_name: &str) -> Result<Vec<Detection>>;
}
