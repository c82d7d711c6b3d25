//! The end-to-end document scanning pipeline.
//!
//! [`DocumentScanner`] wires the three models together: document
//! detection on the full image, perspective rectification of the best
//! candidate, text-region detection on the rectified document, and batched
//! text recognition over the region crops.

mod result;

pub use result::{RecognizedText, ScanOutput};

use crate::core::config::ScannerConfig;
use crate::core::inference::OrtInfer;
use crate::core::{ScanError, ScanResult};
use crate::processors::contrast::auto_contrast;
use crate::processors::ctc::CtcGreedyDecoder;
use crate::processors::detection::{Detection, DetectionPostProcess};
use crate::processors::geometry::Size;
use crate::processors::letterbox::{Alignment, LetterboxTransform};
use crate::processors::normalization::NormalizeImage;
use crate::processors::rectify::Rectifier;
use crate::processors::text_regions::{TextRegion, TextRegionPostProcess};
use image::{Rgb, RgbImage, imageops};
use std::path::PathBuf;
use tracing::{debug, info};

/// Histogram clip percentage for the optional contrast stretch.
const CONTRAST_CLIP_PERCENT: f32 = 5.0;

/// End-to-end identity-document scanner.
pub struct DocumentScanner {
    config: ScannerConfig,
    detector: OrtInfer,
    text_detector: OrtInfer,
    recognizer: OrtInfer,
    detection_post: DetectionPostProcess,
    text_post: TextRegionPostProcess,
    decoder: CtcGreedyDecoder,
    normalize: NormalizeImage,
    rectifier: Rectifier,
}

impl std::fmt::Debug for DocumentScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentScanner")
            .field("config", &self.config)
            .finish()
    }
}

impl DocumentScanner {
    /// Starts building a scanner.
    pub fn builder() -> DocumentScannerBuilder {
        DocumentScannerBuilder::default()
    }

    /// Scans one image.
    ///
    /// Returns `Ok(None)` when no detection passes the label and geometry
    /// gates; everything downstream of an accepted detection reports its
    /// failures as errors.
    ///
    /// # Errors
    ///
    /// Propagates inference failures and rectification failures; see
    /// [`ScanError`].
    pub fn scan(&self, image: &RgbImage) -> ScanResult<Option<ScanOutput>> {
        let Some(detection) = self.detect(image)? else {
            return Ok(None);
        };

        info!(
            label = %detection.label,
            confidence = detection.confidence,
            "document detected"
        );

        let mut rectified = self.rectifier.rectify(image, &detection)?;
        if self.config.auto_contrast {
            rectified = auto_contrast(&rectified, CONTRAST_CLIP_PERCENT);
        }

        let regions = self.detect_text_regions(&rectified)?;
        let texts = self.recognize(&rectified, &regions)?;

        Ok(Some(ScanOutput {
            detection,
            rectified,
            texts,
        }))
    }

    /// Runs the detector and picks the scan candidate.
    fn detect(&self, image: &RgbImage) -> ScanResult<Option<Detection>> {
        let (input_width, input_height) = self.config.detector.input_size;
        let transform = LetterboxTransform::new(
            Size::new(image.width(), image.height()),
            Size::new(input_width, input_height),
            Alignment::CENTER,
        )?;

        let input = transform.apply(image, Rgb([0, 0, 0]));
        let tensor = self.normalize.to_batch(&input)?;
        let (boxes, mask_basis) = self.detector.infer_detection(&tensor)?;

        let detections = self.detection_post.apply(&boxes, &mask_basis, &transform)?;
        debug!(candidates = detections.len(), "raw detections");

        Ok(select_candidate(
            detections,
            &self.detection_post,
            &self.config.detector.target_label,
        ))
    }

    /// Runs the text detector over the rectified document.
    fn detect_text_regions(&self, rectified: &RgbImage) -> ScanResult<Vec<TextRegion>> {
        let (input_width, input_height) = self.config.text_detector.input_size;
        let transform = LetterboxTransform::new(
            Size::new(rectified.width(), rectified.height()),
            Size::new(input_width, input_height),
            Alignment::CENTER,
        )?;

        let input = transform.apply(rectified, Rgb([0, 0, 0]));
        let tensor = self.normalize.to_batch(&input)?;
        let prob_map = self.text_detector.infer_4d(&tensor)?;

        let mut regions = self.text_post.apply(&prob_map, &transform)?;
        // Reading order: top to bottom, then left to right.
        regions.sort_by_key(|r| (r.bbox.y, r.bbox.x));
        Ok(regions)
    }

    /// Recognizes every region crop, batching inference calls.
    fn recognize(
        &self,
        rectified: &RgbImage,
        regions: &[TextRegion],
    ) -> ScanResult<Vec<RecognizedText>> {
        let (input_width, input_height) = self.config.recognizer.input_size;
        let input_size = Size::new(input_width, input_height);

        // Region boxes are already clamped to the rectified frame; only
        // degenerate ones are dropped.
        let crops: Vec<(TextRegion, RgbImage)> = regions
            .iter()
            .filter(|r| r.bbox.width > 0 && r.bbox.height > 0)
            .map(|r| {
                let crop = imageops::crop_imm(
                    rectified,
                    r.bbox.x.max(0) as u32,
                    r.bbox.y.max(0) as u32,
                    r.bbox.width,
                    r.bbox.height,
                )
                .to_image();
                (*r, crop)
            })
            .collect();

        let mut texts = Vec::with_capacity(crops.len());

        for chunk in crops.chunks(self.config.recognizer.batch_size.max(1)) {
            let mut batch = Vec::with_capacity(chunk.len());
            for (_, crop) in chunk {
                let transform = LetterboxTransform::new(
                    Size::new(crop.width(), crop.height()),
                    input_size,
                    Alignment::TOP_LEFT,
                )?;
                batch.push(transform.apply(crop, Rgb([255, 255, 255])));
            }

            let tensor = self.normalize.stack(&batch)?;
            let logits = self.recognizer.infer_3d(&tensor)?;
            let decoded = self.decoder.decode(&logits)?;

            for ((region, _), line) in chunk.iter().zip(decoded) {
                texts.push(RecognizedText {
                    bbox: region.bbox,
                    text: line.text,
                    confidence: line.confidence,
                });
            }
        }

        debug!(lines = texts.len(), "recognition finished");
        Ok(texts)
    }
}

/// Picks the first detection carrying the target label that passes the
/// geometry gate.
fn select_candidate(
    detections: Vec<Detection>,
    post: &DetectionPostProcess,
    target_label: &str,
) -> Option<Detection> {
    detections.into_iter().find(|detection| {
        detection.label == target_label && post.passes_geometry(&detection.bbox)
    })
}

/// Builder for [`DocumentScanner`].
#[derive(Debug, Default)]
pub struct DocumentScannerBuilder {
    detector_model: Option<PathBuf>,
    text_detector_model: Option<PathBuf>,
    recognizer_model: Option<PathBuf>,
    config: ScannerConfig,
}

impl DocumentScannerBuilder {
    /// Sets the document detector model path.
    pub fn detector_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.detector_model = Some(path.into());
        self
    }

    /// Sets the text-region detector model path.
    pub fn text_detector_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.text_detector_model = Some(path.into());
        self
    }

    /// Sets the text recognizer model path.
    pub fn recognizer_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.recognizer_model = Some(path.into());
        self
    }

    /// Replaces the default configuration.
    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the three models and assembles the scanner.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ConfigError`] if a model path is missing, or a
    /// session error if a model fails to load.
    pub fn build(self) -> ScanResult<DocumentScanner> {
        let detector_path = self
            .detector_model
            .ok_or_else(|| ScanError::config_error("detector model path not set"))?;
        let text_detector_path = self
            .text_detector_model
            .ok_or_else(|| ScanError::config_error("text detector model path not set"))?;
        let recognizer_path = self
            .recognizer_model
            .ok_or_else(|| ScanError::config_error("recognizer model path not set"))?;

        let detector = OrtInfer::new(&detector_path, "detector")?;
        let text_detector = OrtInfer::new(&text_detector_path, "text-detector")?;
        let recognizer = OrtInfer::new(&recognizer_path, "recognizer")?;

        let detection_post = DetectionPostProcess::new(self.config.detector.clone());
        let text_post = TextRegionPostProcess::new(self.config.text_detector.clone());
        let decoder = CtcGreedyDecoder::new(&self.config.recognizer.vocab);

        Ok(DocumentScanner {
            config: self.config,
            detector,
            text_detector,
            recognizer,
            detection_post,
            text_post,
            decoder,
            normalize: NormalizeImage,
            rectifier: Rectifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DetectorConfig;
    use crate::processors::geometry::Rect;
    use image::GrayImage;

    fn detection(label: &str, bbox: Rect) -> Detection {
        Detection {
            label: label.to_string(),
            class_id: 1,
            confidence: 0.9,
            bbox,
            mask: GrayImage::new(bbox.width.max(1), bbox.height.max(1)),
        }
    }

    fn post() -> DetectionPostProcess {
        DetectionPostProcess::new(DetectorConfig::default())
    }

    #[test]
    fn test_candidate_requires_target_label() {
        let detections = vec![
            detection("card", Rect::new(0, 0, 200, 130)),
            detection("id-card", Rect::new(0, 0, 200, 130)),
        ];
        let picked = select_candidate(detections, &post(), "id-card").unwrap();
        assert_eq!(picked.label, "id-card");
    }

    #[test]
    fn test_candidate_requires_geometry_gate() {
        // Right label but long side too small, then too elongated.
        let detections = vec![
            detection("id-card", Rect::new(0, 0, 90, 60)),
            detection("id-card", Rect::new(0, 0, 600, 100)),
        ];
        assert!(select_candidate(detections, &post(), "id-card").is_none());
    }

    #[test]
    fn test_first_acceptable_candidate_wins() {
        let detections = vec![
            detection("id-card", Rect::new(10, 10, 200, 130)),
            detection("id-card", Rect::new(50, 50, 220, 140)),
        ];
        let picked = select_candidate(detections, &post(), "id-card").unwrap();
        assert_eq!(picked.bbox, Rect::new(10, 10, 200, 130));
    }

    #[test]
    fn test_builder_requires_all_model_paths() {
        let result = DocumentScanner::builder()
            .detector_model("detector.onnx")
            .recognizer_model("recognizer.onnx")
            .build();
        assert!(matches!(result, Err(ScanError::ConfigError { .. })));
    }
}
