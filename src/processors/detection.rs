//! Document detection post-processing.
//!
//! The detector emits a fixed-capacity list of candidate boxes, each
//! carrying `[x1, y1, x2, y2, score, class, coefficients...]` in the model
//! input frame, plus a shared mask basis tensor. This module filters the
//! candidates, clamps their boxes, reconstructs each survivor's mask and
//! maps everything back into the original image frame.

use crate::core::config::DetectorConfig;
use crate::core::{ScanError, ScanResult, Tensor3D, Tensor4D};
use crate::processors::geometry::Rect;
use crate::processors::letterbox::LetterboxTransform;
use crate::processors::mask::MaskDecoder;
use image::GrayImage;
use tracing::debug;

/// One accepted document detection, in original-image coordinates.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Class label from the detector configuration.
    pub label: String,
    /// Raw class index.
    pub class_id: usize,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box in the original image frame.
    pub bbox: Rect,
    /// Segmentation mask, sized exactly to `bbox`.
    pub mask: GrayImage,
}

/// Turns raw detector outputs into [`Detection`]s.
#[derive(Debug, Clone)]
pub struct DetectionPostProcess {
    config: DetectorConfig,
    mask_decoder: MaskDecoder,
}

impl DetectionPostProcess {
    /// Creates a post-processor for the given detector configuration.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            mask_decoder: MaskDecoder,
        }
    }

    /// Filters and decodes the detector's raw outputs.
    ///
    /// `boxes` has shape `(1, detections, 6 + coefficients)`; `mask_basis`
    /// has shape `(1, coefficients, height, width)`. Candidates below the
    /// confidence threshold or with an out-of-range class index are
    /// dropped; candidates whose box collapses after clamping are dropped
    /// with a debug log rather than failing the batch.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidInput`] if the tensor layout does not
    /// carry enough values per detection for the basis stack.
    pub fn apply(
        &self,
        boxes: &Tensor3D,
        mask_basis: &Tensor4D,
        transform: &LetterboxTransform,
    ) -> ScanResult<Vec<Detection>> {
        let (_, max_detections, stride) = boxes.dim();
        let coefficients = mask_basis.dim().1;

        if stride < 6 + coefficients {
            return Err(ScanError::invalid_input(format!(
                "detection stride {} cannot hold box, score, class and {} mask coefficients",
                stride, coefficients
            )));
        }

        let input_size = transform.dst_size();
        let basis = mask_basis.index_axis(ndarray::Axis(0), 0);
        let mut results = Vec::new();

        for i in 0..max_detections {
            let score = boxes[[0, i, 4]];
            let class_id = boxes[[0, i, 5]];

            if score < self.config.confidence
                || class_id < 0.0
                || class_id as usize >= self.config.labels.len()
            {
                continue;
            }
            let class_id = class_id as usize;

            // Clamp to the input frame, min corner floored, max corner
            // ceiled.
            let x1 = boxes[[0, i, 0]].floor().clamp(0.0, input_size.width as f32) as i32;
            let y1 = boxes[[0, i, 1]].floor().clamp(0.0, input_size.height as f32) as i32;
            let x2 = boxes[[0, i, 2]].ceil().clamp(0.0, input_size.width as f32) as i32;
            let y2 = boxes[[0, i, 3]].ceil().clamp(0.0, input_size.height as f32) as i32;

            if x2 <= x1 || y2 <= y1 {
                debug!(detection = i, "skipping detection with collapsed box");
                continue;
            }
            let input_rect = Rect::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32);

            let coeffs: Vec<f32> = (0..coefficients).map(|k| boxes[[0, i, 6 + k]]).collect();

            let (mask, bbox) =
                match self
                    .mask_decoder
                    .decode(&coeffs, basis, input_rect, transform)
                {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        debug!(detection = i, error = %e, "skipping detection with unusable mask");
                        continue;
                    }
                };

            results.push(Detection {
                label: self.config.labels[class_id].clone(),
                class_id,
                confidence: score,
                bbox,
                mask,
            });
        }

        Ok(results)
    }

    /// Applies the geometric acceptance gate: the box's longer side must
    /// reach `min_long_side` and the long/short aspect ratio must fall in
    /// `aspect_range`.
    pub fn passes_geometry(&self, bbox: &Rect) -> bool {
        let long = bbox.width.max(bbox.height);
        let short = bbox.width.min(bbox.height);
        if long < self.config.min_long_side || short == 0 {
            return false;
        }
        let ratio = long as f32 / short as f32;
        let (min_ratio, max_ratio) = self.config.aspect_range;
        ratio >= min_ratio && ratio <= max_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::geometry::Size;
    use crate::processors::letterbox::Alignment;
    use ndarray::{Array3, Array4};

    const K: usize = 2;

    fn config() -> DetectorConfig {
        DetectorConfig {
            confidence: 0.8,
            labels: vec!["card".to_string(), "id-card".to_string()],
            target_label: "id-card".to_string(),
            input_size: (64, 64),
            min_long_side: 100,
            aspect_range: (1.0, 2.0),
        }
    }

    fn transform() -> LetterboxTransform {
        LetterboxTransform::new(Size::new(64, 64), Size::new(64, 64), Alignment::CENTER).unwrap()
    }

    fn boxes(rows: &[[f32; 6]]) -> Tensor3D {
        let mut tensor = Array3::zeros((1, rows.len(), 6 + K));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                tensor[[0, i, j]] = v;
            }
        }
        tensor
    }

    fn basis() -> Tensor4D {
        Array4::zeros((1, K, 8, 8))
    }

    #[test]
    fn test_confidence_threshold_is_inclusive_boundary() {
        let post = DetectionPostProcess::new(config());
        let boxes = boxes(&[
            [4.0, 4.0, 40.0, 24.0, 0.79, 1.0],
            [4.0, 4.0, 40.0, 24.0, 0.80, 1.0],
        ]);

        let results = post.apply(&boxes, &basis(), &transform()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence, 0.80);
    }

    #[test]
    fn test_out_of_range_class_dropped() {
        let post = DetectionPostProcess::new(config());
        let boxes = boxes(&[
            [4.0, 4.0, 40.0, 24.0, 0.9, 5.0],
            [4.0, 4.0, 40.0, 24.0, 0.9, -1.0],
        ]);
        let results = post.apply(&boxes, &basis(), &transform()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_detection_carries_label_and_original_frame_box() {
        let post = DetectionPostProcess::new(config());
        let boxes = boxes(&[[4.2, 4.7, 39.1, 23.4, 0.95, 1.0]]);
        let results = post.apply(&boxes, &basis(), &transform()).unwrap();

        assert_eq!(results.len(), 1);
        let detection = &results[0];
        assert_eq!(detection.label, "id-card");
        // Identity letterbox: floor/ceil of the raw box.
        assert_eq!(detection.bbox, Rect::new(4, 4, 36, 20));
        assert_eq!(
            detection.mask.dimensions(),
            (detection.bbox.width, detection.bbox.height)
        );
    }

    #[test]
    fn test_collapsed_box_skipped_without_error() {
        let post = DetectionPostProcess::new(config());
        let boxes = boxes(&[[10.0, 10.0, 10.0, 30.0, 0.9, 1.0]]);
        let results = post.apply(&boxes, &basis(), &transform()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_stride_too_small_rejected() {
        let post = DetectionPostProcess::new(config());
        let boxes = Array3::zeros((1, 1, 6));
        assert!(post.apply(&boxes, &basis(), &transform()).is_err());
    }

    #[test]
    fn test_geometry_gate() {
        let post = DetectionPostProcess::new(config());
        // Long side below minimum.
        assert!(!post.passes_geometry(&Rect::new(0, 0, 90, 60)));
        // Aspect ratio above 2.
        assert!(!post.passes_geometry(&Rect::new(0, 0, 300, 100)));
        // Square is allowed (ratio exactly 1).
        assert!(post.passes_geometry(&Rect::new(0, 0, 120, 120)));
        assert!(post.passes_geometry(&Rect::new(0, 0, 160, 100)));
    }
}
