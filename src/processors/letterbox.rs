//! Letterbox coordinate remapping.
//!
//! A letterbox resize scales an image to fit a fixed target canvas while
//! preserving aspect ratio, then pads the remainder. [`LetterboxTransform`]
//! captures the parameters of one such resize and derives both the forward
//! (`scale_*`) and inverse (`revert_*`) coordinate mappings from them, so
//! boxes produced in the model input frame can be carried back into the
//! original image frame without drift.
//!
//! Point mappings use asymmetric rounding: a box's min corner is floored
//! and its max corner is ceiled, so a rectangle never collapses or bleeds
//! outward across a round trip.

use crate::core::{ScanError, ScanResult};
use crate::processors::geometry::{Point, Rect, Size};
use image::{Rgb, RgbImage, imageops};
use serde::{Deserialize, Serialize};

/// Horizontal anchor for the scaled content inside the padded canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HorizontalAlign {
    /// Content flush with the left edge.
    Left,
    /// Content centered horizontally.
    #[default]
    Center,
    /// Content flush with the right edge.
    Right,
}

/// Vertical anchor for the scaled content inside the padded canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlign {
    /// Content flush with the top edge.
    Top,
    /// Content centered vertically.
    #[default]
    Middle,
    /// Content flush with the bottom edge.
    Bottom,
}

/// One of the nine alignment anchors (3 horizontal x 3 vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alignment {
    /// Horizontal anchor.
    pub horizontal: HorizontalAlign,
    /// Vertical anchor.
    pub vertical: VerticalAlign,
}

impl Alignment {
    /// Content centered in the canvas (the detection default).
    pub const CENTER: Alignment = Alignment {
        horizontal: HorizontalAlign::Center,
        vertical: VerticalAlign::Middle,
    };

    /// Content anchored at the top-left corner (the recognition default).
    pub const TOP_LEFT: Alignment = Alignment {
        horizontal: HorizontalAlign::Left,
        vertical: VerticalAlign::Top,
    };
}

/// The parameters of a single letterbox resize, and the coordinate
/// mappings derived from them.
///
/// Invariants: `ratio = min(dst.width / src.width, dst.height / src.height)`
/// and `pad_left + scaled_width + pad_right == dst.width` (likewise for
/// height). Instances are immutable once constructed.
#[derive(Debug, Clone, Copy)]
pub struct LetterboxTransform {
    src: Size,
    dst: Size,
    ratio: f32,
    scaled_width: u32,
    scaled_height: u32,
    pad_left: u32,
    pad_top: u32,
    pad_right: u32,
    pad_bottom: u32,
}

impl LetterboxTransform {
    /// Computes the transform for scaling `src` into `dst` at the given
    /// alignment.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidDimension`] if either size has a zero
    /// dimension.
    pub fn new(src: Size, dst: Size, align: Alignment) -> ScanResult<Self> {
        if src.is_degenerate() {
            return Err(ScanError::invalid_dimension(src.width, src.height));
        }
        if dst.is_degenerate() {
            return Err(ScanError::invalid_dimension(dst.width, dst.height));
        }

        let ratio = (dst.width as f32 / src.width as f32)
            .min(dst.height as f32 / src.height as f32);

        let scaled_width = (src.width as f32 * ratio).floor() as u32;
        let scaled_height = (src.height as f32 * ratio).floor() as u32;

        let dw = dst.width - scaled_width;
        let dh = dst.height - scaled_height;

        let pad_left = match align.horizontal {
            HorizontalAlign::Left => 0,
            HorizontalAlign::Center => dw / 2,
            HorizontalAlign::Right => dw,
        };
        let pad_top = match align.vertical {
            VerticalAlign::Top => 0,
            VerticalAlign::Middle => dh / 2,
            VerticalAlign::Bottom => dh,
        };

        Ok(Self {
            src,
            dst,
            ratio,
            scaled_width,
            scaled_height,
            pad_left,
            pad_top,
            pad_right: dw - pad_left,
            pad_bottom: dh - pad_top,
        })
    }

    /// The scale factor applied to the source image.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// The source image size.
    pub fn src_size(&self) -> Size {
        self.src
    }

    /// The padded destination canvas size.
    pub fn dst_size(&self) -> Size {
        self.dst
    }

    /// Padding on each side as `(left, top, right, bottom)`.
    pub fn padding(&self) -> (u32, u32, u32, u32) {
        (self.pad_left, self.pad_top, self.pad_right, self.pad_bottom)
    }

    /// Maps a source-frame point into the padded destination frame.
    ///
    /// Coordinates are floored unless `round_up` is set, and clamped to the
    /// scaled content area before the alignment offset is applied.
    pub fn scale_point(&self, p: Point, round_up: bool) -> Point {
        let x = self.round(p.x * self.ratio, round_up);
        let y = self.round(p.y * self.ratio, round_up);

        Point::new(
            self.pad_left as f32 + x.clamp(0.0, self.scaled_width as f32),
            self.pad_top as f32 + y.clamp(0.0, self.scaled_height as f32),
        )
    }

    /// Maps a destination-frame point back into the source frame: the
    /// exact inverse of [`scale_point`](Self::scale_point), with the same
    /// floor/ceil asymmetry and clamping to the source bounds.
    pub fn revert_point(&self, p: Point, round_up: bool) -> Point {
        let x = self.round((p.x - self.pad_left as f32) / self.ratio, round_up);
        let y = self.round((p.y - self.pad_top as f32) / self.ratio, round_up);

        Point::new(
            x.clamp(0.0, self.src.width as f32),
            y.clamp(0.0, self.src.height as f32),
        )
    }

    /// Maps a source-frame rectangle into the destination frame.
    ///
    /// The two opposite corners are mapped (min corner floored, max corner
    /// ceiled) and width/height are rebuilt from the mapped corners, never
    /// by scaling the extent directly.
    pub fn scale_rect(&self, rect: Rect) -> Rect {
        let pt1 = self.scale_point(Point::new(rect.x as f32, rect.y as f32), false);
        let pt2 = self.scale_point(Point::new(rect.right() as f32, rect.bottom() as f32), true);

        Rect::new(
            pt1.x as i32,
            pt1.y as i32,
            (pt2.x - pt1.x).max(0.0) as u32,
            (pt2.y - pt1.y).max(0.0) as u32,
        )
    }

    /// Maps a destination-frame rectangle back into the source frame.
    pub fn revert_rect(&self, rect: Rect) -> Rect {
        let pt1 = self.revert_point(Point::new(rect.x as f32, rect.y as f32), false);
        let pt2 = self.revert_point(Point::new(rect.right() as f32, rect.bottom() as f32), true);

        Rect::new(
            pt1.x as i32,
            pt1.y as i32,
            (pt2.x - pt1.x).max(0.0) as u32,
            (pt2.y - pt1.y).max(0.0) as u32,
        )
    }

    /// Performs the letterbox resize itself: scales the image to the
    /// content area (Catmull-Rom) and pads the remainder with `fill` at
    /// the configured alignment.
    pub fn apply(&self, img: &RgbImage, fill: Rgb<u8>) -> RgbImage {
        let scaled = imageops::resize(
            img,
            self.scaled_width,
            self.scaled_height,
            imageops::FilterType::CatmullRom,
        );

        let mut canvas = RgbImage::from_pixel(self.dst.width, self.dst.height, fill);
        imageops::overlay(
            &mut canvas,
            &scaled,
            self.pad_left as i64,
            self.pad_top as i64,
        );
        canvas
    }

    fn round(&self, v: f32, round_up: bool) -> f32 {
        if round_up { v.ceil() } else { v.floor() }
    }
}
