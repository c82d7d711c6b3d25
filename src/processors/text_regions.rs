//! Text region extraction from a probability map.
//!
//! The text detector produces a per-pixel logit map over its input frame.
//! Regions are recovered by thresholding the sigmoid of the map, tracing
//! outer contours, expanding each contour's bounding box by an unclip
//! margin proportional to its area/perimeter ratio, and reverting the
//! boxes into the frame the input was letterboxed from.

use crate::core::config::TextDetectorConfig;
use crate::core::{ScanError, ScanResult, Tensor4D};
use crate::processors::geometry::{Point, Rect, bounding_rect, contour_area, contour_perimeter};
use crate::processors::letterbox::LetterboxTransform;
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use tracing::debug;

/// A detected text region in the rectified document frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRegion {
    /// Bounding box of the region, unclip margin included.
    pub bbox: Rect,
}

/// Turns the text detector's probability map into [`TextRegion`]s.
#[derive(Debug, Clone)]
pub struct TextRegionPostProcess {
    config: TextDetectorConfig,
}

impl TextRegionPostProcess {
    /// Creates a post-processor for the given text-detector configuration.
    pub fn new(config: TextDetectorConfig) -> Self {
        Self { config }
    }

    /// Extracts text regions from the `(1, 1, height, width)` logit map.
    ///
    /// Contours whose area does not exceed `box_min_area` are dropped.
    /// Each surviving contour contributes one box: its axis-aligned
    /// bounding rectangle grown on every side by
    /// `ceil(area * unclip_ratio / perimeter)` pixels, mapped back through
    /// `transform`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidInput`] if the map is not single-channel
    /// with a batch of one.
    pub fn apply(
        &self,
        prob_map: &Tensor4D,
        transform: &LetterboxTransform,
    ) -> ScanResult<Vec<TextRegion>> {
        let (batch, channels, height, width) = prob_map.dim();
        if batch != 1 || channels != 1 {
            return Err(ScanError::invalid_input(format!(
                "expected a (1, 1, h, w) probability map, got ({batch}, {channels}, {height}, {width})"
            )));
        }

        let mut binary = GrayImage::new(width as u32, height as u32);
        for y in 0..height {
            for x in 0..width {
                let prob = sigmoid(prob_map[[0, 0, y, x]]);
                if prob >= self.config.confidence {
                    binary.put_pixel(x as u32, y as u32, image::Luma([255]));
                }
            }
        }

        let contours = find_contours::<i32>(&binary);
        let mut regions = Vec::new();

        for contour in &contours {
            if contour.border_type != BorderType::Outer {
                continue;
            }

            let points: Vec<Point> = contour
                .points
                .iter()
                .map(|p| Point::from_imageproc_point(*p))
                .collect();

            let area = contour_area(&points);
            let perimeter = contour_perimeter(&points);
            if area <= self.config.box_min_area || perimeter <= 0.0 {
                continue;
            }

            let margin = (area * self.config.unclip_ratio / perimeter).ceil() as i32;
            let unclipped = bounding_rect(&points).expand(margin);
            regions.push(TextRegion {
                bbox: transform.revert_rect(unclipped),
            });
        }

        debug!(
            regions = regions.len(),
            contours = contours.len(),
            "text region extraction"
        );

        Ok(regions)
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
