//! Error types for the scanning pipeline.
//!
//! This module defines the error taxonomy for the pipeline: invalid
//! geometry going into the letterbox transform, image loading failures,
//! inference failures, and configuration problems. Locally recoverable
//! conditions (degenerate line fits in corner estimation, mask-consistency
//! mismatches during rectification) are handled by fallbacks at their call
//! sites and never appear here.

use thiserror::Error;

/// Convenient result alias for scanning operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Enum representing the errors that can occur in the scanning pipeline.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A size with a zero dimension was passed where a non-degenerate
    /// size is required (e.g. into [`crate::processors::LetterboxTransform`]).
    #[error("invalid dimension: {width}x{height}")]
    InvalidDimension {
        /// The offending width.
        width: u32,
        /// The offending height.
        height: u32,
    },

    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error indicating invalid input to a processing stage.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error occurred while running a model.
    #[error("inference on model '{model_name}' failed: {context}")]
    Inference {
        /// The name of the model that failed.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Creates a [`ScanError::InvalidDimension`] from a width and height.
    pub fn invalid_dimension(width: u32, height: u32) -> Self {
        Self::InvalidDimension { width, height }
    }

    /// Creates a [`ScanError::InvalidInput`] with the given message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a [`ScanError::Inference`] with model name and context.
    pub fn inference(
        model_name: &str,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a [`ScanError::ConfigError`] with the given message.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

/// A minimal string-backed error for wrapping plain messages as sources.
#[derive(Debug)]
pub(crate) struct SimpleError {
    message: String,
}

impl SimpleError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SimpleError {}
