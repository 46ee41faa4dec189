//! QrGenerator - Item Label Encoding
//!
//! Encodes `{"item_id", "item_name"}` JSON into a PNG QR image that the
//! presence tracker recognizes as item data once printed and shelved.

use crate::error::{Error, Result};
use crate::presence_tracker::ItemQrData;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Minimum rendered edge length in pixels
pub const QR_IMAGE_SIZE: u32 = 256;

/// Generated QR label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQr {
    pub item_id: String,
    pub item_name: String,
    /// Base64 encoded PNG
    pub qr_code: String,
    /// JSON payload encoded into the image
    pub qr_data: String,
    pub format: String,
    /// Rendered edge length in pixels
    pub size: u32,
}

/// Render a QR label for an item
pub fn generate(item: &ItemQrData) -> Result<GeneratedQr> {
    if item.item_id.trim().is_empty() {
        return Err(Error::Validation(
            "item_id is required and must be a non-empty string".to_string(),
        ));
    }
    if item.item_name.trim().is_empty() {
        return Err(Error::Validation(
            "item_name is required and must be a non-empty string".to_string(),
        ));
    }

    let qr_data = serde_json::to_string(item)?;

    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::M)
        .map_err(|e| Error::QrEncode(e.to_string()))?;
    let rendered = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_IMAGE_SIZE, QR_IMAGE_SIZE)
        .build();
    let size = rendered.width();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(rendered)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::QrEncode(e.to_string()))?;

    tracing::info!(item_id = %item.item_id, bytes = png.len(), "Generated QR code");

    Ok(GeneratedQr {
        item_id: item.item_id.clone(),
        item_name: item.item_name.clone(),
        qr_code: base64::engine::general_purpose::STANDARD.encode(&png),
        qr_data,
        format: "base64-png".to_string(),
        size,
    })
}
