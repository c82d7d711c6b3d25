//! Geometric primitives for the scanning pipeline.
//!
//! Points, sizes and rectangles used across the processors, plus the
//! contour algorithms the rectification path relies on: shoelace area,
//! perimeter, Graham-scan convex hull and the rotating-calipers minimum
//! area rectangle.

use imageproc::point::Point as ImageProcPoint;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a point from an imageproc point with integer coordinates.
    pub fn from_imageproc_point(p: ImageProcPoint<i32>) -> Self {
        Self {
            x: p.x as f32,
            y: p.y as f32,
        }
    }

    /// Converts this point to an imageproc point, truncating coordinates.
    pub fn to_imageproc_point(self) -> ImageProcPoint<i32> {
        ImageProcPoint::new(self.x as i32, self.y as i32)
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a new size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned integer rectangle.
///
/// The coordinate frame a rectangle lives in (model input frame vs original
/// image frame) is stated by the field or function carrying it; the only
/// operations that move a rectangle between frames are
/// [`crate::processors::LetterboxTransform::scale_rect`] and
/// [`crate::processors::LetterboxTransform::revert_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// X-coordinate of the top-left corner.
    pub x: i32,
    /// Y-coordinate of the top-left corner.
    pub y: i32,
    /// Width of the rectangle.
    pub width: u32,
    /// Height of the rectangle.
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// X-coordinate one past the right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Y-coordinate one past the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Grows the rectangle by `margin` pixels on every side.
    pub fn expand(&self, margin: i32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: (self.width as i64 + 2 * margin as i64).max(0) as u32,
            height: (self.height as i64 + 2 * margin as i64).max(0) as u32,
        }
    }
}

/// Calculates the area of a closed contour using the shoelace formula.
///
/// Returns 0.0 for contours with fewer than 3 points.
pub fn contour_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = points.len();
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area.abs() / 2.0
}

/// Calculates the perimeter of a closed contour, including the closing
/// edge back to the first point.
pub fn contour_perimeter(points: &[Point]) -> f32 {
    let n = points.len();
    let mut perimeter = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        perimeter += points[i].distance(&points[j]);
    }
    perimeter
}

/// Axis-aligned bounding rectangle of a point set, as a pixel-grid
/// extent: the width and height count the extremal pixels inclusively,
/// so a single point yields a 1x1 rectangle.
///
/// Returns a zero rectangle at the origin for an empty set.
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some((min_x, max_x)) = points.iter().map(|p| p.x).minmax().into_option() else {
        return Rect::new(0, 0, 0, 0);
    };
    let Some((min_y, max_y)) = points.iter().map(|p| p.y).minmax().into_option() else {
        return Rect::new(0, 0, 0, 0);
    };

    let x = min_x.floor() as i32;
    let y = min_y.floor() as i32;
    Rect::new(
        x,
        y,
        (max_x.floor() as i32 - x + 1).max(0) as u32,
        (max_y.floor() as i32 - y + 1).max(0) as u32,
    )
}

/// Cross product of the vectors `p1->p2` and `p1->p3`. Positive for a
/// counter-clockwise turn, negative for clockwise, zero for collinear.
fn cross_product(p1: &Point, p2: &Point, p3: &Point) -> f32 {
    (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
}

/// Computes the convex hull of a point set using Graham's scan.
///
/// Point sets with fewer than 3 points are returned unchanged.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut points = points.to_vec();

    // Pivot: lowest y, leftmost on ties.
    let mut start_idx = 0;
    for i in 1..points.len() {
        if points[i].y < points[start_idx].y
            || (points[i].y == points[start_idx].y && points[i].x < points[start_idx].x)
        {
            start_idx = i;
        }
    }
    points.swap(0, start_idx);
    let start_point = points[0];

    points[1..].sort_by(|a, b| {
        let cross = cross_product(&start_point, a, b);
        if cross == 0.0 {
            let dist_a = (a.x - start_point.x).powi(2) + (a.y - start_point.y).powi(2);
            let dist_b = (b.x - start_point.x).powi(2) + (b.y - start_point.y).powi(2);
            dist_a
                .partial_cmp(&dist_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        } else if cross > 0.0 {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });

    let mut hull: Vec<Point> = Vec::new();
    for point in points {
        while hull.len() > 1
            && cross_product(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) <= 0.0
        {
            hull.pop();
        }
        hull.push(point);
    }

    hull
}

/// A rotated rectangle of minimum area enclosing a contour.
#[derive(Debug, Clone, Copy)]
pub struct MinAreaRect {
    /// The center point of the rectangle.
    pub center: Point,
    /// The width of the rectangle.
    pub width: f32,
    /// The height of the rectangle.
    pub height: f32,
    /// The rotation angle of the rectangle in degrees.
    pub angle: f32,
}

/// Computes the minimum area rectangle enclosing a point set using the
/// rotating calipers algorithm over the convex hull.
///
/// Degenerate inputs (fewer than 3 hull points) fall back to the
/// axis-aligned bounding rectangle.
pub fn min_area_rect(points: &[Point]) -> MinAreaRect {
    let hull = convex_hull(points);

    if hull.len() < 3 {
        let bounds = bounding_rect(points);
        return MinAreaRect {
            center: Point::new(
                bounds.x as f32 + bounds.width as f32 / 2.0,
                bounds.y as f32 + bounds.height as f32 / 2.0,
            ),
            width: bounds.width as f32,
            height: bounds.height as f32,
            angle: 0.0,
        };
    }

    let mut min_area = f32::MAX;
    let mut min_rect = MinAreaRect {
        center: Point::new(0.0, 0.0),
        width: 0.0,
        height: 0.0,
        angle: 0.0,
    };

    let n = hull.len();
    for i in 0..n {
        let j = (i + 1) % n;

        let edge_x = hull[j].x - hull[i].x;
        let edge_y = hull[j].y - hull[i].y;
        let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();

        if edge_length < f32::EPSILON {
            continue;
        }

        let nx = edge_x / edge_length;
        let ny = edge_y / edge_length;
        let px = -ny;
        let py = nx;

        let mut min_n = f32::MAX;
        let mut max_n = f32::MIN;
        let mut min_p = f32::MAX;
        let mut max_p = f32::MIN;

        for point in &hull {
            let proj_n = nx * (point.x - hull[i].x) + ny * (point.y - hull[i].y);
            min_n = min_n.min(proj_n);
            max_n = max_n.max(proj_n);

            let proj_p = px * (point.x - hull[i].x) + py * (point.y - hull[i].y);
            min_p = min_p.min(proj_p);
            max_p = max_p.max(proj_p);
        }

        let width = max_n - min_n;
        let height = max_p - min_p;
        let area = width * height;

        if area < min_area {
            min_area = area;

            let center_n = (min_n + max_n) / 2.0;
            let center_p = (min_p + max_p) / 2.0;

            min_rect = MinAreaRect {
                center: Point::new(
                    hull[i].x + center_n * nx + center_p * px,
                    hull[i].y + center_n * ny + center_p * py,
                ),
                width,
                height,
                angle: f32::atan2(ny, nx) * 180.0 / PI,
            };
        }
    }

    min_rect
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f32) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ]
    }

    #[test]
    fn test_contour_area_square() {
        assert_eq!(contour_area(&square(10.0)), 100.0);
    }

    #[test]
    fn test_contour_area_degenerate() {
        assert_eq!(contour_area(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_contour_perimeter_square() {
        assert_eq!(contour_perimeter(&square(10.0)), 40.0);
    }

    #[test]
    fn test_bounding_rect_counts_extremal_pixels() {
        let points = vec![
            Point::new(2.0, 3.0),
            Point::new(8.0, 1.0),
            Point::new(5.0, 9.0),
        ];
        let rect = bounding_rect(&points);
        assert_eq!(rect, Rect::new(2, 1, 7, 9));
    }

    #[test]
    fn test_bounding_rect_single_point() {
        let rect = bounding_rect(&[Point::new(4.0, 7.0)]);
        assert_eq!(rect, Rect::new(4, 7, 1, 1));
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let mut points = square(10.0);
        points.push(Point::new(5.0, 5.0));
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_min_area_rect_square() {
        let rect = min_area_rect(&square(10.0));
        assert!((rect.center.x - 5.0).abs() < 1e-4);
        assert!((rect.center.y - 5.0).abs() < 1e-4);
        assert!((rect.width * rect.height - 100.0).abs() < 1e-2);
    }

    #[test]
    fn test_rect_expand() {
        let rect = Rect::new(10, 10, 20, 20).expand(5);
        assert_eq!(rect, Rect::new(5, 5, 30, 30));
    }
}
