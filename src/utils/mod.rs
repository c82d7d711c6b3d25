//! Shared utilities.

pub mod transform;

use crate::core::{ScanError, ScanResult};
use image::RgbImage;
use std::path::Path;

/// Loads an image from disk and converts it to RGB.
///
/// # Errors
///
/// Returns [`ScanError::ImageLoad`] if the file cannot be read or decoded.
pub fn load_image(path: impl AsRef<Path>) -> ScanResult<RgbImage> {
    let img = image::open(path).map_err(ScanError::ImageLoad)?;
    Ok(img.to_rgb8())
}
