//! Configuration types for the scanning pipeline.
//!
//! All configuration structs are serde-compatible so a full scanner setup
//! can be loaded from JSON, and every field has a documented default that
//! matches the models the pipeline was built for.

use serde::{Deserialize, Serialize};

/// Default character vocabulary for the recognizer, matching the character
/// set the recognition model was trained with. The blank symbol is not part
/// of the vocabulary; it occupies the last class index.
pub const DEFAULT_VOCAB: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~°£€¥¢฿àâéèêëîïôùûüçÀÂÉÈÊËÎÏÔÙÛÜÇ";

/// Configuration for the document detector and its post-processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Confidence threshold below which detections are discarded.
    /// Default: 0.8
    pub confidence: f32,
    /// Class labels, indexed by the model's class id. Detections whose
    /// class id falls outside this list are discarded.
    pub labels: Vec<String>,
    /// Label of the document class the pipeline should rectify.
    pub target_label: String,
    /// Model input size (width, height). Default: (640, 640)
    pub input_size: (u32, u32),
    /// Minimum length of the detection box's longer side, in original-image
    /// pixels. Default: 100
    pub min_long_side: u32,
    /// Accepted range for the box's longer/shorter aspect ratio.
    /// Default: (1.0, 2.0)
    pub aspect_range: (f32, f32),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence: 0.8,
            labels: vec!["card".to_string(), "id-card".to_string()],
            target_label: "id-card".to_string(),
            input_size: (640, 640),
            min_long_side: 100,
            aspect_range: (1.0, 2.0),
        }
    }
}

/// Configuration for the text-region detector and its post-processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDetectorConfig {
    /// Probability threshold for binarizing the text probability map.
    /// Default: 0.3
    pub confidence: f32,
    /// Ratio controlling the unclip expansion of detected regions.
    /// Default: 2.0
    pub unclip_ratio: f32,
    /// Minimum contour area, in input-frame pixels, for a region to be
    /// kept. Default: 64.0
    pub box_min_area: f32,
    /// Model input size (width, height). Default: (1024, 1024)
    pub input_size: (u32, u32),
}

impl Default for TextDetectorConfig {
    fn default() -> Self {
        Self {
            confidence: 0.3,
            unclip_ratio: 2.0,
            box_min_area: 64.0,
            input_size: (1024, 1024),
        }
    }
}

/// Configuration for the text recognizer and its CTC decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Character vocabulary; the blank symbol is implicit at index
    /// `vocab.len()`. Default: [`DEFAULT_VOCAB`]
    pub vocab: String,
    /// Number of region crops recognized per inference call. Batch
    /// boundaries affect throughput only, never decoding results.
    /// Default: 32
    pub batch_size: usize,
    /// Model input size (width, height). Default: (128, 32)
    pub input_size: (u32, u32),
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            vocab: DEFAULT_VOCAB.to_string(),
            batch_size: 32,
            input_size: (128, 32),
        }
    }
}

/// Top-level configuration for [`crate::pipeline::DocumentScanner`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Detector configuration.
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Text-region detector configuration.
    #[serde(default)]
    pub text_detector: TextDetectorConfig,
    /// Recognizer configuration.
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    /// Whether to apply an auto-contrast stretch to the rectified document
    /// before text detection. Default: false
    #[serde(default)]
    pub auto_contrast: bool,
}

impl ScannerConfig {
    /// Loads a scanner configuration from a JSON string.
    pub fn from_json(json: &str) -> crate::core::ScanResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::core::ScanError::config_error(format!("invalid JSON config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_model_contract() {
        let config = ScannerConfig::default();
        assert_eq!(config.detector.confidence, 0.8);
        assert_eq!(config.text_detector.confidence, 0.3);
        assert_eq!(config.text_detector.unclip_ratio, 2.0);
        assert_eq!(config.text_detector.box_min_area, 64.0);
        assert_eq!(config.recognizer.batch_size, 32);
    }

    #[test]
    fn test_from_json_partial() {
        let config = ScannerConfig::from_json(
            r#"{ "detector": { "confidence": 0.5, "labels": ["card"],
                 "target_label": "card", "input_size": [640, 640],
                 "min_long_side": 100, "aspect_range": [1.0, 2.0] } }"#,
        )
        .unwrap();
        assert_eq!(config.detector.confidence, 0.5);
        assert_eq!(config.recognizer.batch_size, 32);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(ScannerConfig::from_json("not json").is_err());
    }
}
