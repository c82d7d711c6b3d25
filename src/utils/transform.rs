//! Perspective warping.
//!
//! The rectifier maps an arbitrary document quadrilateral onto a fixed
//! rectangular canvas. The 3x3 homography is recovered by solving the
//! standard 8x8 linear system from the four point correspondences, and the
//! warp itself uses inverse mapping with bilinear sampling, parallelized
//! per output row.

use crate::core::{ScanError, ScanResult};
use crate::processors::corners::CornerQuad;
use crate::processors::geometry::Point;
use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

/// Warps the quadrilateral `quad` of `src` onto a `dst_width` x
/// `dst_height` canvas, corners mapped to the canvas corners in the same
/// order. Pixels sampled outside `src` come out black.
///
/// # Errors
///
/// Returns [`ScanError::InvalidInput`] if the canvas is empty, the four
/// corners are degenerate (no homography exists), or the homography is not
/// invertible.
pub fn warp_quad(
    src: &RgbImage,
    quad: &CornerQuad,
    dst_width: u32,
    dst_height: u32,
) -> ScanResult<RgbImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(ScanError::invalid_input("warp target has zero size"));
    }

    let src_points = quad.to_array();
    let dst_points = [
        Point::new(0.0, 0.0),
        Point::new(dst_width as f32, 0.0),
        Point::new(0.0, dst_height as f32),
        Point::new(dst_width as f32, dst_height as f32),
    ];

    let matrix = perspective_transform(&src_points, &dst_points)?;
    warp_perspective(src, &matrix, dst_width, dst_height)
}

/// Solves for the homography mapping `src_points[i]` to `dst_points[i]`.
fn perspective_transform(
    src_points: &[Point; 4],
    dst_points: &[Point; 4],
) -> ScanResult<Matrix3<f32>> {
    let mut a = nalgebra::DMatrix::<f32>::zeros(8, 8);
    let mut b = nalgebra::DVector::<f32>::zeros(8);

    for i in 0..4 {
        let src = src_points[i];
        let dst = dst_points[i];

        a.set_row(
            i * 2,
            &nalgebra::RowDVector::from_row_slice(&[
                src.x,
                src.y,
                1.0,
                0.0,
                0.0,
                0.0,
                -src.x * dst.x,
                -src.y * dst.x,
            ]),
        );
        b[i * 2] = dst.x;

        a.set_row(
            i * 2 + 1,
            &nalgebra::RowDVector::from_row_slice(&[
                0.0,
                0.0,
                0.0,
                src.x,
                src.y,
                1.0,
                -src.x * dst.y,
                -src.y * dst.y,
            ]),
        );
        b[i * 2 + 1] = dst.y;
    }

    let solution = a.lu().solve(&b).ok_or_else(|| {
        ScanError::invalid_input("degenerate corner quadrilateral, no perspective transform")
    })?;

    Ok(Matrix3::new(
        solution[0],
        solution[1],
        solution[2],
        solution[3],
        solution[4],
        solution[5],
        solution[6],
        solution[7],
        1.0,
    ))
}

/// Inverse-mapping perspective warp with bilinear sampling.
fn warp_perspective(
    src_image: &RgbImage,
    transform_matrix: &Matrix3<f32>,
    dst_width: u32,
    dst_height: u32,
) -> ScanResult<RgbImage> {
    let inv_matrix = transform_matrix
        .try_inverse()
        .ok_or_else(|| ScanError::invalid_input("perspective transform is not invertible"))?;

    let mut dst_image = RgbImage::new(dst_width, dst_height);
    let (src_width, src_height) = src_image.dimensions();
    let buffer: &mut [u8] = dst_image.as_mut();

    buffer
        .par_chunks_mut((dst_width * 3) as usize)
        .enumerate()
        .for_each(|(dst_y, row_buffer)| {
            for dst_x in 0..dst_width {
                let src_point = inv_matrix * Vector3::new(dst_x as f32, dst_y as f32, 1.0);

                let mut pixel = Rgb([0, 0, 0]);
                if src_point.z.abs() > f32::EPSILON {
                    let src_x = src_point.x / src_point.z;
                    let src_y = src_point.y / src_point.z;

                    if src_x >= 0.0
                        && src_y >= 0.0
                        && src_x < (src_width - 1) as f32
                        && src_y < (src_height - 1) as f32
                    {
                        pixel = bilinear_sample(src_image, src_x, src_y);
                    }
                }

                let index = (dst_x * 3) as usize;
                row_buffer[index..index + 3].copy_from_slice(&pixel.0);
            }
        });

    Ok(dst_image)
}

fn bilinear_sample(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let x1 = x.floor() as u32;
    let y1 = y.floor() as u32;
    let x2 = (x1 + 1).min(image.width() - 1);
    let y2 = (y1 + 1).min(image.height() - 1);

    let dx = x - x1 as f32;
    let dy = y - y1 as f32;

    let p11 = image.get_pixel(x1, y1);
    let p12 = image.get_pixel(x1, y2);
    let p21 = image.get_pixel(x2, y1);
    let p22 = image.get_pixel(x2, y2);

    let mut result = [0u8; 3];
    for (i, channel) in result.iter_mut().enumerate() {
        let val = (1.0 - dx) * (1.0 - dy) * p11.0[i] as f32
            + dx * (1.0 - dy) * p21.0[i] as f32
            + (1.0 - dx) * dy * p12.0[i] as f32
            + dx * dy * p22.0[i] as f32;
        *channel = val.round().clamp(0.0, 255.0) as u8;
    }

    Rgb(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_aligned_quad(x0: f32, y0: f32, w: f32, h: f32) -> CornerQuad {
        CornerQuad {
            top_left: Point::new(x0, y0),
            top_right: Point::new(x0 + w, y0),
            bottom_left: Point::new(x0, y0 + h),
            bottom_right: Point::new(x0 + w, y0 + h),
        }
    }

    #[test]
    fn test_perspective_transform_identity_square() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        ];
        let m = perspective_transform(&pts, &pts).unwrap();
        let p = m * Vector3::new(0.25, 0.75, 1.0);
        assert!((p.x / p.z - 0.25).abs() < 1e-4);
        assert!((p.y / p.z - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_perspective_transform_degenerate_points() {
        let collinear = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        ];
        assert!(perspective_transform(&collinear, &dst).is_err());
    }

    #[test]
    fn test_warp_quad_zero_canvas_rejected() {
        let img = RgbImage::new(8, 8);
        let quad = axis_aligned_quad(0.0, 0.0, 8.0, 8.0);
        assert!(warp_quad(&img, &quad, 0, 4).is_err());
    }

    #[test]
    fn test_warp_quad_extracts_region() {
        // Left half white, right half black; warp the left half only.
        let mut img = RgbImage::new(16, 8);
        for y in 0..8 {
            for x in 0..8 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }

        let quad = axis_aligned_quad(0.0, 0.0, 7.0, 7.0);
        let out = warp_quad(&img, &quad, 8, 8).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(*out.get_pixel(3, 3), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_warp_quad_canvas_dimensions() {
        let img = RgbImage::new(100, 100);
        let quad = axis_aligned_quad(10.0, 10.0, 60.0, 40.0);
        let out = warp_quad(&img, &quad, 640, 404).unwrap();
        assert_eq!(out.dimensions(), (640, 404));
    }
}
