//! Image and tensor processors.
//!
//! Everything between a raw image and a model tensor, and between raw
//! model outputs and usable results, lives here. Processors are plain
//! data-in/data-out types with no model or I/O dependencies, so each can
//! be exercised on synthetic inputs.

pub mod contrast;
pub mod corners;
pub mod ctc;
pub mod detection;
pub mod geometry;
pub mod letterbox;
pub mod mask;
pub mod normalization;
pub mod rectify;
pub mod text_regions;

pub use contrast::auto_contrast;
pub use corners::{CornerQuad, find_corners};
pub use ctc::{CtcGreedyDecoder, DecodedText};
pub use detection::{Detection, DetectionPostProcess};
pub use geometry::{Point, Rect, Size};
pub use letterbox::{Alignment, HorizontalAlign, LetterboxTransform, VerticalAlign};
pub use mask::MaskDecoder;
pub use normalization::NormalizeImage;
pub use rectify::{RECTIFIED_HEIGHT, RECTIFIED_WIDTH, Rectifier};
pub use text_regions::{TextRegion, TextRegionPostProcess};
