//! Pipeline output types.

use crate::processors::detection::Detection;
use crate::processors::geometry::Rect;
use image::RgbImage;

/// One recognized text line on the rectified document.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    /// Region box in rectified-document coordinates.
    pub bbox: Rect,
    /// Decoded text.
    pub text: String,
    /// Minimum per-timestep probability along the decoded sequence.
    pub confidence: f32,
}

/// The full result of scanning one image.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// The document detection that drove the scan.
    pub detection: Detection,
    /// The rectified document, always 640x404 landscape.
    pub rectified: RgbImage,
    /// Recognized text lines in top-to-bottom, left-to-right order.
    pub texts: Vec<RecognizedText>,
}
