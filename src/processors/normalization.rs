//! Image-to-tensor conversion.
//!
//! All three models take planar CHW float input scaled to `[0, 1]`, with
//! channels in RGB order and no mean/std normalization.

use crate::core::{ScanError, ScanResult, Tensor3D, Tensor4D};
use image::RgbImage;
use ndarray::{Array3, Array4};

/// Converts RGB images into the CHW float tensors the models consume.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeImage;

impl NormalizeImage {
    /// Converts a single image to a `(3, height, width)` tensor.
    pub fn to_chw(&self, img: &RgbImage) -> Tensor3D {
        let (width, height) = img.dimensions();
        let mut tensor = Array3::zeros((3, height as usize, width as usize));

        for (x, y, pixel) in img.enumerate_pixels() {
            for c in 0..3 {
                tensor[[c, y as usize, x as usize]] = pixel.0[c] as f32 / 255.0;
            }
        }

        tensor
    }

    /// Converts a single image to a `(1, 3, height, width)` tensor.
    pub fn to_batch(&self, img: &RgbImage) -> ScanResult<Tensor4D> {
        self.stack(std::slice::from_ref(img))
    }

    /// Stacks images of identical size into a `(batch, 3, height, width)`
    /// tensor.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidInput`] for an empty batch or mismatched
    /// image sizes.
    pub fn stack(&self, images: &[RgbImage]) -> ScanResult<Tensor4D> {
        let first = images
            .first()
            .ok_or_else(|| ScanError::invalid_input("cannot stack an empty image batch"))?;
        let (width, height) = first.dimensions();

        let mut tensor = Array4::zeros((images.len(), 3, height as usize, width as usize));

        for (n, img) in images.iter().enumerate() {
            if img.dimensions() != (width, height) {
                return Err(ScanError::invalid_input(format!(
                    "batch image {} is {}x{}, expected {}x{}",
                    n,
                    img.width(),
                    img.height(),
                    width,
                    height
                )));
            }

            for (x, y, pixel) in img.enumerate_pixels() {
                for c in 0..3 {
                    tensor[[n, c, y as usize, x as usize]] = pixel.0[c] as f32 / 255.0;
                }
            }
        }

        Ok(tensor)
    }
}
