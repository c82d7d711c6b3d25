//! # cardscan
//!
//! A Rust library that locates an identity document in a photograph,
//! rectifies it into a flat fronto-parallel image, and reads text regions
//! from it using ONNX models.
//!
//! The library is built around three models and the geometric
//! post-processing that turns their raw tensor outputs into usable results:
//!
//! - **Detection**: an instance-segmentation detector finds the document and
//!   produces a bounding box plus a low-resolution mask reconstructed from
//!   coefficient maps ([`processors::DetectionPostProcess`],
//!   [`processors::MaskDecoder`]).
//! - **Rectification**: the document mask is refined into a quadrilateral
//!   (corner estimation from the mask contour with a mask-consistency
//!   fallback) and warped into a canonical landscape canvas
//!   ([`processors::Rectifier`], [`processors::find_corners`]).
//! - **Text extraction**: a text-detection probability map is converted to
//!   expanded region boxes ([`processors::TextRegionPostProcess`]), the
//!   regions are cropped and batched through a recognizer, and per-timestep
//!   class probabilities are greedily decoded into strings
//!   ([`processors::CtcGreedyDecoder`]).
//!
//! All coordinate remapping between the model input frame and the original
//! image frame goes through [`processors::LetterboxTransform`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cardscan::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> ScanResult<()> {
//! let scanner = DocumentScanner::builder()
//!     .detector_model(Path::new("models/detector.onnx"))
//!     .text_detector_model(Path::new("models/text_detection.onnx"))
//!     .recognizer_model(Path::new("models/recognition.onnx"))
//!     .build()?;
//!
//! let image = load_image(Path::new("photo.jpg"))?;
//! match scanner.scan(&image)? {
//!     Some(result) => {
//!         for line in &result.texts {
//!             println!("{}: {}", line.confidence, line.text);
//!         }
//!     }
//!     None => println!("no document found"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Brings the essentials into scope with a single use statement:
///
/// ```rust
/// use cardscan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{ScanError, ScanResult, ScannerConfig};
    pub use crate::pipeline::{DocumentScanner, RecognizedText, ScanOutput};
    pub use crate::processors::{Detection, TextRegion};
    pub use crate::utils::load_image;
}
