//! The core module of the scanning pipeline.
//!
//! This module contains the fundamental components shared by the rest of the
//! crate:
//! - Tensor type aliases used at the inference boundary
//! - Error handling
//! - Configuration management
//! - ONNX Runtime inference wrappers
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod errors;
pub mod inference;

pub use config::{
    DetectorConfig, RecognizerConfig, ScannerConfig, TextDetectorConfig,
};
pub use errors::{ScanError, ScanResult};
pub use inference::OrtInfer;

/// A 3D tensor of f32 values (batch, timesteps, classes).
pub type Tensor3D = ndarray::Array3<f32>;

/// A 4D tensor of f32 values (batch, channels, height, width).
pub type Tensor4D = ndarray::Array4<f32>;

/// Initializes the tracing subscriber for logging.
///
/// Sets up the tracing subscriber with an environment filter and a
/// formatting layer. Typically called once at application startup.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
