//! Perspective rectification of a detected document.
//!
//! The rectifier re-segments the detection crop with an Otsu threshold to
//! get a tighter outline than the model mask, validates that outline
//! against the mask by IoU, estimates the document's four corners and
//! warps the quadrilateral onto a fixed-size landscape canvas.

use crate::core::{ScanError, ScanResult};
use crate::processors::corners::find_corners;
use crate::processors::detection::Detection;
use crate::processors::geometry::{Point, contour_area, convex_hull};
use crate::utils::transform::warp_quad;
use image::{GrayImage, Luma, RgbImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::otsu_level;
use imageproc::drawing::draw_polygon_mut;
use tracing::debug;

/// Output canvas width of a rectified document.
pub const RECTIFIED_WIDTH: u32 = 640;
/// Output canvas height of a rectified document.
pub const RECTIFIED_HEIGHT: u32 = 404;

/// Minimum IoU between the re-segmented outline and the detection mask
/// for the outline to be trusted.
const MASK_CONSISTENCY_IOU: f64 = 0.9;

/// Rectifies detected documents onto a fixed landscape canvas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectifier;

impl Rectifier {
    /// Rectifies the document described by `detection` out of `src`.
    ///
    /// The output is always `640x404` landscape; portrait detections are
    /// warped to a portrait canvas first and rotated 90 degrees
    /// counter-clockwise.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidInput`] if the detection box is empty,
    /// no document outline can be recovered from either the crop or the
    /// mask, or the corner quadrilateral is degenerate.
    pub fn rectify(&self, src: &RgbImage, detection: &Detection) -> ScanResult<RgbImage> {
        let bbox = detection.bbox;
        if bbox.width == 0 || bbox.height == 0 {
            return Err(ScanError::invalid_input("empty detection box"));
        }

        let crop = imageops::crop_imm(src, bbox.x.max(0) as u32, bbox.y.max(0) as u32, bbox.width, bbox.height)
            .to_image();
        let gray = masked_gray(&crop, &detection.mask);

        // Re-segment the crop: Otsu binarization of the mask-gated
        // grayscale, then the largest outer contour's convex hull.
        let threshold = otsu_level(&gray);
        let mut binary = gray;
        for pixel in binary.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
        }

        let hull = match largest_hull(&binary) {
            Some(hull) if mask_iou(&hull, &detection.mask) >= MASK_CONSISTENCY_IOU => hull,
            other => {
                // The re-segmented outline disagrees with the detector;
                // fall back to the mask's own outline, unvalidated.
                if other.is_some() {
                    debug!("re-segmented outline inconsistent with mask, using mask outline");
                } else {
                    debug!("no outline in re-segmented crop, using mask outline");
                }
                largest_hull(&detection.mask).ok_or_else(|| {
                    ScanError::invalid_input("no document outline in detection mask")
                })?
            }
        };

        // Corners are found in crop coordinates and shifted into the full
        // image frame for the warp.
        let corners = find_corners(&hull).offset(bbox.x as f32, bbox.y as f32);

        let portrait = bbox.height > bbox.width;
        let (dst_width, dst_height) = if portrait {
            (RECTIFIED_HEIGHT, RECTIFIED_WIDTH)
        } else {
            (RECTIFIED_WIDTH, RECTIFIED_HEIGHT)
        };

        let warped = warp_quad(src, &corners, dst_width, dst_height)?;

        if portrait {
            Ok(imageops::rotate270(&warped))
        } else {
            Ok(warped)
        }
    }
}

/// Grayscale of the crop, attenuated by the mask: pixels outside the mask
/// go dark so the Otsu split separates document from background.
fn masked_gray(crop: &RgbImage, mask: &GrayImage) -> GrayImage {
    let mut gray = GrayImage::new(crop.width(), crop.height());
    for (x, y, pixel) in crop.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let gate = mask.get_pixel(x, y).0[0] as f32 / 255.0;
        gray.put_pixel(x, y, Luma([(luma * gate).floor() as u8]));
    }
    gray
}

/// Convex hull of the largest outer contour of a binary image, or `None`
/// if the image has no foreground.
fn largest_hull(binary: &GrayImage) -> Option<Vec<Point>> {
    let contours = find_contours::<i32>(binary);

    let largest = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| {
            c.points
                .iter()
                .map(|p| Point::from_imageproc_point(*p))
                .collect::<Vec<_>>()
        })
        .max_by(|a, b| {
            contour_area(a)
                .partial_cmp(&contour_area(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

    let hull = convex_hull(&largest);
    (hull.len() >= 3).then_some(hull)
}

/// IoU between the filled hull polygon and the detection mask, both taken
/// as "nonzero pixel" sets over the same crop-sized grid.
fn mask_iou(hull: &[Point], mask: &GrayImage) -> f64 {
    let mut hull_mask = GrayImage::new(mask.width(), mask.height());
    let polygon: Vec<imageproc::point::Point<i32>> =
        hull.iter().map(|p| p.to_imageproc_point()).collect();

    // draw_polygon_mut requires an open polygon.
    if polygon.len() >= 3 && polygon.first() != polygon.last() {
        draw_polygon_mut(&mut hull_mask, &polygon, Luma([255]));
    }

    let mut intersection = 0u64;
    let mut union = 0u64;
    for (a, b) in hull_mask.pixels().zip(mask.pixels()) {
        let a = a.0[0] > 0;
        let b = b.0[0] > 0;
        if a && b {
            intersection += 1;
        }
        if a || b {
            union += 1;
        }
    }

    if union > 0 {
        intersection as f64 / union as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::geometry::Rect;
    use image::Rgb;

    /// A detection whose crop contains a bright card over a dark border,
    /// with the mask covering exactly the card.
    fn synthetic_detection(
        src_size: (u32, u32),
        bbox: Rect,
        card_margin: u32,
        card_color: Rgb<u8>,
    ) -> (RgbImage, Detection) {
        let mut src = RgbImage::from_pixel(src_size.0, src_size.1, Rgb([10, 10, 10]));
        let mut mask = GrayImage::new(bbox.width, bbox.height);

        for y in 0..bbox.height {
            for x in 0..bbox.width {
                let inside = x >= card_margin
                    && x < bbox.width - card_margin
                    && y >= card_margin
                    && y < bbox.height - card_margin;
                if inside {
                    src.put_pixel(bbox.x as u32 + x, bbox.y as u32 + y, card_color);
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }

        let detection = Detection {
            label: "id-card".to_string(),
            class_id: 1,
            confidence: 0.95,
            bbox,
            mask,
        };
        (src, detection)
    }

    #[test]
    fn test_landscape_detection_fills_landscape_canvas() {
        let (src, detection) = synthetic_detection(
            (300, 200),
            Rect::new(20, 30, 200, 130),
            8,
            Rgb([230, 230, 230]),
        );

        let out = Rectifier.rectify(&src, &detection).unwrap();
        assert_eq!(out.dimensions(), (RECTIFIED_WIDTH, RECTIFIED_HEIGHT));
        // Canvas center lands inside the card.
        assert_eq!(
            *out.get_pixel(RECTIFIED_WIDTH / 2, RECTIFIED_HEIGHT / 2),
            Rgb([230, 230, 230])
        );
    }

    #[test]
    fn test_portrait_detection_rotates_to_landscape() {
        let (src, detection) = synthetic_detection(
            (200, 300),
            Rect::new(30, 20, 130, 200),
            8,
            Rgb([230, 230, 230]),
        );

        let out = Rectifier.rectify(&src, &detection).unwrap();
        // Portrait input still comes out on the landscape canvas.
        assert_eq!(out.dimensions(), (RECTIFIED_WIDTH, RECTIFIED_HEIGHT));
        assert_eq!(
            *out.get_pixel(RECTIFIED_WIDTH / 2, RECTIFIED_HEIGHT / 2),
            Rgb([230, 230, 230])
        );
    }

    #[test]
    fn test_empty_bbox_rejected() {
        let (src, mut detection) = synthetic_detection(
            (300, 200),
            Rect::new(20, 30, 200, 130),
            8,
            Rgb([230, 230, 230]),
        );
        detection.bbox = Rect::new(20, 30, 0, 130);
        assert!(Rectifier.rectify(&src, &detection).is_err());
    }

    #[test]
    fn test_blank_crop_and_mask_rejected() {
        // All-dark crop and an all-zero mask leave nothing to outline.
        let src = RgbImage::from_pixel(100, 80, Rgb([5, 5, 5]));
        let detection = Detection {
            label: "id-card".to_string(),
            class_id: 1,
            confidence: 0.9,
            bbox: Rect::new(10, 10, 60, 40),
            mask: GrayImage::new(60, 40),
        };
        assert!(Rectifier.rectify(&src, &detection).is_err());
    }

    #[test]
    fn test_mask_fallback_when_resegmentation_disagrees() {
        // The masked document is bright on its left half and dark on its
        // right half, so the Otsu split keeps only the bright half. That
        // outline covers half the mask, the IoU check fails, and the mask's
        // own outline drives the warp instead, so both halves survive.
        let mut src = RgbImage::from_pixel(300, 200, Rgb([0, 0, 0]));
        let bbox = Rect::new(20, 30, 200, 130);
        let mut mask = GrayImage::new(200, 130);
        for y in 40..90 {
            for x in 50..150 {
                mask.put_pixel(x, y, Luma([255]));
                let color = if x < 100 {
                    Rgb([200, 200, 200])
                } else {
                    Rgb([30, 30, 30])
                };
                src.put_pixel(bbox.x as u32 + x, bbox.y as u32 + y, color);
            }
        }

        let detection = Detection {
            label: "id-card".to_string(),
            class_id: 1,
            confidence: 0.9,
            bbox,
            mask,
        };

        let out = Rectifier.rectify(&src, &detection).unwrap();
        assert_eq!(out.dimensions(), (RECTIFIED_WIDTH, RECTIFIED_HEIGHT));
        // The warp spans the whole mask region, so the dark right half is
        // still present; an Otsu-only warp would have zoomed into the
        // bright half.
        assert_eq!(
            *out.get_pixel(RECTIFIED_WIDTH / 4, RECTIFIED_HEIGHT / 2),
            Rgb([200, 200, 200])
        );
        assert_eq!(
            *out.get_pixel(3 * RECTIFIED_WIDTH / 4, RECTIFIED_HEIGHT / 2),
            Rgb([30, 30, 30])
        );
    }
}
