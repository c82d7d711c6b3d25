//! Instance mask reconstruction.
//!
//! The detector emits per-detection mask coefficients plus a shared set of
//! low-resolution basis maps. A detection's mask is the sigmoid of the
//! linear combination of the basis maps, quantized to 8-bit, upscaled to
//! the model input frame, cropped to the detection box and finally resized
//! into the original image frame.

use crate::core::{ScanError, ScanResult};
use crate::processors::geometry::Rect;
use crate::processors::letterbox::LetterboxTransform;
use image::{GrayImage, imageops};
use ndarray::ArrayView3;

/// Reconstructs per-detection masks from coefficients and basis maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskDecoder;

impl MaskDecoder {
    /// Decodes one detection's mask.
    ///
    /// `basis` is the `(coefficients, height, width)` prototype stack for
    /// the whole image; `input_rect` is the detection box in the model
    /// input frame; `transform` is the letterbox used to build that input.
    /// Returns the mask resized to the original-frame box together with
    /// that box.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidInput`] if the coefficient count does
    /// not match the basis stack, or if either box is empty.
    pub fn decode(
        &self,
        coefficients: &[f32],
        basis: ArrayView3<'_, f32>,
        input_rect: Rect,
        transform: &LetterboxTransform,
    ) -> ScanResult<(GrayImage, Rect)> {
        let (k, mask_height, mask_width) = basis.dim();
        if coefficients.len() != k {
            return Err(ScanError::invalid_input(format!(
                "{} mask coefficients for {} basis maps",
                coefficients.len(),
                k
            )));
        }
        if input_rect.width == 0 || input_rect.height == 0 {
            return Err(ScanError::invalid_input("empty detection box"));
        }

        // Linear combination of the basis maps, squashed and quantized.
        let mut low_res = GrayImage::new(mask_width as u32, mask_height as u32);
        for y in 0..mask_height {
            for x in 0..mask_width {
                let mut sum = 0.0f32;
                for (c, &coeff) in coefficients.iter().enumerate() {
                    sum += coeff * basis[[c, y, x]];
                }
                let value = (sigmoid(sum) * 255.0).round().clamp(0.0, 255.0) as u8;
                low_res.put_pixel(x as u32, y as u32, image::Luma([value]));
            }
        }

        // Upscale to the model input frame, then cut out the detection box.
        let input_size = transform.dst_size();
        let full = imageops::resize(
            &low_res,
            input_size.width,
            input_size.height,
            imageops::FilterType::CatmullRom,
        );
        let cropped = imageops::crop_imm(
            &full,
            input_rect.x.max(0) as u32,
            input_rect.y.max(0) as u32,
            input_rect.width,
            input_rect.height,
        )
        .to_image();

        // Carry the box back to the original frame and match the mask to it.
        let original_rect = transform.revert_rect(input_rect);
        if original_rect.width == 0 || original_rect.height == 0 {
            return Err(ScanError::invalid_input(
                "detection box collapses to nothing in the original frame",
            ));
        }

        let mask = imageops::resize(
            &cropped,
            original_rect.width,
            original_rect.height,
            imageops::FilterType::CatmullRom,
        );

        Ok((mask, original_rect))
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::geometry::Size;
    use crate::processors::letterbox::Alignment;
    use ndarray::Array3;

    fn identity_transform(size: u32) -> LetterboxTransform {
        LetterboxTransform::new(
            Size::new(size, size),
            Size::new(size, size),
            Alignment::CENTER,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_logit_quantizes_to_128() {
        // All-zero coefficients make every combined logit 0; sigmoid(0) is
        // 0.5 and must round to 128, not truncate to 127.
        let basis = Array3::<f32>::from_elem((2, 8, 8), 3.7);
        let transform = identity_transform(16);
        let (mask, rect) = MaskDecoder
            .decode(
                &[0.0, 0.0],
                basis.view(),
                Rect::new(0, 0, 16, 16),
                &transform,
            )
            .unwrap();

        assert_eq!(rect, Rect::new(0, 0, 16, 16));
        assert_eq!(mask.get_pixel(8, 8).0[0], 128);
    }

    #[test]
    fn test_saturated_logits_reach_extremes() {
        let mut basis = Array3::<f32>::zeros((1, 4, 4));
        basis.fill(20.0);
        let transform = identity_transform(8);

        let (mask, _) = MaskDecoder
            .decode(&[1.0], basis.view(), Rect::new(0, 0, 8, 8), &transform)
            .unwrap();
        assert_eq!(mask.get_pixel(4, 4).0[0], 255);

        let (mask, _) = MaskDecoder
            .decode(&[-1.0], basis.view(), Rect::new(0, 0, 8, 8), &transform)
            .unwrap();
        assert_eq!(mask.get_pixel(4, 4).0[0], 0);
    }

    #[test]
    fn test_coefficient_count_mismatch_rejected() {
        let basis = Array3::<f32>::zeros((3, 4, 4));
        let transform = identity_transform(8);
        let result = MaskDecoder.decode(&[1.0], basis.view(), Rect::new(0, 0, 8, 8), &transform);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_box_rejected() {
        let basis = Array3::<f32>::zeros((1, 4, 4));
        let transform = identity_transform(8);
        let result = MaskDecoder.decode(&[1.0], basis.view(), Rect::new(2, 2, 0, 4), &transform);
        assert!(result.is_err());
    }

    #[test]
    fn test_mask_matches_original_frame_box() {
        // 32x32 source letterboxed into 16x16: ratio 0.5, no padding.
        let transform = LetterboxTransform::new(
            Size::new(32, 32),
            Size::new(16, 16),
            Alignment::CENTER,
        )
        .unwrap();
        let basis = Array3::<f32>::zeros((1, 4, 4));

        let (mask, rect) = MaskDecoder
            .decode(&[0.0], basis.view(), Rect::new(2, 2, 8, 8), &transform)
            .unwrap();
        assert_eq!(rect, Rect::new(4, 4, 16, 16));
        assert_eq!(mask.dimensions(), (rect.width, rect.height));
    }
}
