//! Histogram-based automatic contrast stretch.
//!
//! Computes a grayscale histogram, clips a percentage of the darkest and
//! brightest mass, and linearly remaps the remaining range to the full
//! `[0, 255]` span. Applied to rectified documents before text detection
//! to even out lighting.

use image::{Rgb, RgbImage};

/// Stretches the contrast of `src` by clipping `clip_percent` percent of
/// the histogram mass, split evenly between both tails.
pub fn auto_contrast(src: &RgbImage, clip_percent: f32) -> RgbImage {
    let mut histogram = [0u32; 256];
    for pixel in src.pixels() {
        histogram[luma(pixel) as usize] += 1;
    }

    // Cumulative distribution.
    let mut accumulator = [0u64; 256];
    let mut total = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        total += count as u64;
        accumulator[i] = total;
    }

    if total == 0 {
        return src.clone();
    }

    let clip = (clip_percent as f64 * total as f64) / 100.0 / 2.0;

    let mut minimum_gray = 0usize;
    while minimum_gray < 255 && (accumulator[minimum_gray] as f64) < clip {
        minimum_gray += 1;
    }

    let mut maximum_gray = 255usize;
    while maximum_gray > 0 && accumulator[maximum_gray] as f64 >= total as f64 - clip {
        maximum_gray -= 1;
    }

    if maximum_gray <= minimum_gray {
        return src.clone();
    }

    let alpha = 255.0 / (maximum_gray - minimum_gray) as f32;
    let beta = -(minimum_gray as f32) * alpha;

    let mut dst = RgbImage::new(src.width(), src.height());
    for (x, y, pixel) in src.enumerate_pixels() {
        let mut out = [0u8; 3];
        for c in 0..3 {
            out[c] = (pixel.0[c] as f32 * alpha + beta).round().clamp(0.0, 255.0) as u8;
        }
        dst.put_pixel(x, y, Rgb(out));
    }
    dst
}

/// Rec. 601 luma, rounded.
fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}
