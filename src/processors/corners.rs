//! Quadrilateral corner estimation from a noisy contour.
//!
//! Given a closed contour that approximately traces a quadrilateral (a
//! document's convex hull), this module estimates the four true corners.
//! The contour is split into four quadrants around the minimum-area-rect
//! center and the farthest point per quadrant gives a first corner
//! estimate; all contour points are then re-partitioned into four angular
//! sectors (one per edge), each edge gets a least-squares line fit, and
//! adjacent lines are intersected for sub-pixel corners. Degenerate fits
//! fall back to the extremal points.

use crate::processors::geometry::{Point, min_area_rect};
use tracing::debug;

/// The four corners of a quadrilateral, in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerQuad {
    /// Top-left corner.
    pub top_left: Point,
    /// Top-right corner.
    pub top_right: Point,
    /// Bottom-left corner.
    pub bottom_left: Point,
    /// Bottom-right corner.
    pub bottom_right: Point,
}

impl CornerQuad {
    /// Returns the corners translated by `(dx, dy)`.
    pub fn offset(&self, dx: f32, dy: f32) -> CornerQuad {
        let shift = |p: Point| Point::new(p.x + dx, p.y + dy);
        CornerQuad {
            top_left: shift(self.top_left),
            top_right: shift(self.top_right),
            bottom_left: shift(self.bottom_left),
            bottom_right: shift(self.bottom_right),
        }
    }

    /// Corners as an array ordered top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn to_array(self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }
}

/// A line segment used for edge fitting, stored as two endpoints.
type Line = [f32; 4];

/// Polar angle of `pt` around `center` in degrees, measured so that the
/// four corner directions of a y-down image come out in increasing order
/// top-right, top-left, bottom-left, bottom-right. The sector thresholds
/// below depend on this exact measure.
fn polar_angle(center: Point, pt: Point) -> f32 {
    let theta = (pt.y - center.y).atan2(pt.x - center.x).to_degrees();
    (360.0 - theta) % 360.0
}

/// Fits a straight line to a point set by least squares.
///
/// Horizontal-ish edges fit `y = a*x + b`; vertical-ish edges fit the
/// swapped form `x = c*y + d`, which stays stable for near-vertical lines.
/// A small epsilon guards near-singular denominators. Returns `None` for
/// fewer than 2 points.
fn fit_line(points: &[Point], extent: (f32, f32), vertical: bool) -> Option<Line> {
    let n = points.len() as f32;
    if points.len() < 2 {
        return None;
    }

    if vertical {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        let mut sum_yy = 0.0;

        for p in points {
            sum_x += p.x;
            sum_y += p.y;
            sum_xy += p.x * p.y;
            sum_yy += p.y * p.y;
        }

        let c = (n * sum_xy - sum_y * sum_x) / (n * sum_yy - sum_y * sum_y + 1e-6);
        let d = (sum_x - c * sum_y) / n;

        Some([d, 0.0, c * extent.1 + d, extent.1])
    } else {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        let mut sum_xx = 0.0;

        for p in points {
            sum_x += p.x;
            sum_y += p.y;
            sum_xy += p.x * p.y;
            sum_xx += p.x * p.x;
        }

        let a = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x + 1e-6);
        let b = (sum_y - a * sum_x) / n;

        Some([0.0, b, extent.0, a * extent.0 + b])
    }
}

/// Intersects two lines given as segments, solving the 2x2 system from
/// each line's general form `A*x + B*y = C`. Returns `None` for parallel
/// lines (zero determinant).
fn intersection(l1: Line, l2: Line) -> Option<Point> {
    let [x1, y1, x2, y2] = l1;
    let [x3, y3, x4, y4] = l2;

    let a1 = y2 - y1;
    let b1 = x1 - x2;
    let c1 = a1 * x1 + b1 * y1;

    let a2 = y4 - y3;
    let b2 = x3 - x4;
    let c2 = a2 * x3 + b2 * y3;

    let det = a1 * b2 - a2 * b1;
    if det == 0.0 {
        return None;
    }

    Some(Point::new(
        (b2 * c1 - b1 * c2) / det,
        (a1 * c2 - a2 * c1) / det,
    ))
}

/// Estimates the four corners of a quadrilateral contour.
///
/// Whichever path produces the result (refined line intersections or the
/// extremal-point fallback), corners come back ordered `(top_left,
/// top_right, bottom_left, bottom_right)`.
pub fn find_corners(contour: &[Point]) -> CornerQuad {
    let rect = min_area_rect(contour);
    let center = rect.center;

    // Farthest point per quadrant around the center.
    let mut tl: Option<(Point, f32)> = None;
    let mut tr: Option<(Point, f32)> = None;
    let mut bl: Option<(Point, f32)> = None;
    let mut br: Option<(Point, f32)> = None;

    for &point in contour {
        let dist = point.distance(&center);

        if point.x < center.x && point.y < center.y {
            if tl.is_none_or(|(_, d)| dist > d) {
                tl = Some((point, dist));
            }
        } else if point.x > center.x && point.y < center.y {
            if tr.is_none_or(|(_, d)| dist > d) {
                tr = Some((point, dist));
            }
        } else if point.x < center.x && point.y > center.y {
            if bl.is_none_or(|(_, d)| dist > d) {
                bl = Some((point, dist));
            }
        } else if point.x > center.x && point.y > center.y && br.is_none_or(|(_, d)| dist > d) {
            br = Some((point, dist));
        }
    }

    let origin = Point::new(0.0, 0.0);
    let tl = tl.map(|(p, _)| p);
    let tr = tr.map(|(p, _)| p);
    let bl = bl.map(|(p, _)| p);
    let br = br.map(|(p, _)| p);

    let fallback = CornerQuad {
        top_left: tl.unwrap_or(origin),
        top_right: tr.unwrap_or(origin),
        bottom_left: bl.unwrap_or(origin),
        bottom_right: br.unwrap_or(origin),
    };

    let (Some(tl), Some(tr), Some(bl), Some(br)) = (tl, tr, bl, br) else {
        debug!("corner estimation: empty quadrant, using extremal points");
        return fallback;
    };

    // Sector boundaries at the extremal points' angles. With the measure
    // above the order around the contour is tr < tl < bl < br.
    let da = polar_angle(center, tr);
    let db = polar_angle(center, tl);
    let dc = polar_angle(center, bl);
    let dd = polar_angle(center, br);

    // Each edge sector is seeded with its two corner points.
    let mut top = vec![tl, tr];
    let mut bottom = vec![bl, br];
    let mut left = vec![tl, bl];
    let mut right = vec![tr, br];

    for &point in contour {
        let d = polar_angle(center, point);

        if d > da && d < db {
            top.push(point);
        } else if d > db && d < dc {
            left.push(point);
        } else if d > dc && d < dd {
            bottom.push(point);
        } else if d > dd || d < da {
            right.push(point);
        }
    }

    let extent = (rect.width, rect.height);
    let (Some(t), Some(b), Some(l), Some(r)) = (
        fit_line(&top, extent, false),
        fit_line(&bottom, extent, false),
        fit_line(&left, extent, true),
        fit_line(&right, extent, true),
    ) else {
        debug!("corner estimation: edge fit underdetermined, using extremal points");
        return fallback;
    };

    let (Some(itl), Some(itr), Some(ibl), Some(ibr)) = (
        intersection(t, l),
        intersection(t, r),
        intersection(b, l),
        intersection(b, r),
    ) else {
        debug!("corner estimation: parallel edge lines, using extremal points");
        return fallback;
    };

    CornerQuad {
        top_left: itl,
        top_right: itr,
        bottom_left: ibl,
        bottom_right: ibr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dense contour tracing the edges of an axis-aligned square.
    fn square_contour(x0: f32, y0: f32, side: f32) -> Vec<Point> {
        let mut points = Vec::new();
        let steps = side as i32;
        for i in 0..steps {
            let f = i as f32;
            points.push(Point::new(x0 + f, y0));
            points.push(Point::new(x0 + side, y0 + f));
            points.push(Point::new(x0 + side - f, y0 + side));
            points.push(Point::new(x0, y0 + side - f));
        }
        points
    }

    fn assert_near(p: Point, x: f32, y: f32) {
        assert!(
            (p.x - x).abs() <= 1.0 && (p.y - y).abs() <= 1.0,
            "{p:?} not within 1px of ({x}, {y})"
        );
    }

    #[test]
    fn test_square_corners_recovered() {
        let quad = find_corners(&square_contour(10.0, 20.0, 100.0));
        assert_near(quad.top_left, 10.0, 20.0);
        assert_near(quad.top_right, 110.0, 20.0);
        assert_near(quad.bottom_left, 10.0, 120.0);
        assert_near(quad.bottom_right, 110.0, 120.0);
    }

    #[test]
    fn test_rotated_square_corners_recovered() {
        // 45-degree diamond centered at (50, 50).
        let mut points = Vec::new();
        for i in 0..40 {
            let f = i as f32;
            points.push(Point::new(10.0 + f, 50.0 - f)); // left -> top
            points.push(Point::new(50.0 + f, 10.0 + f)); // top -> right
            points.push(Point::new(90.0 - f, 50.0 + f)); // right -> bottom
            points.push(Point::new(50.0 - f, 90.0 - f)); // bottom -> left
        }
        let quad = find_corners(&points);
        // Extremal points of a diamond land on the axis midlines; the
        // refined corners must stay on the diamond's edges.
        for corner in quad.to_array() {
            let manhattan = (corner.x - 50.0).abs() + (corner.y - 50.0).abs();
            assert!(
                (manhattan - 40.0).abs() <= 2.0,
                "{corner:?} is off the diamond boundary"
            );
        }
    }

    #[test]
    fn test_empty_quadrant_falls_back_to_extremal_points() {
        // No point in the bottom-right quadrant relative to the centroid.
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        let quad = find_corners(&points);
        assert_eq!(quad.top_right, Point::new(10.0, 0.0));
        assert_eq!(quad.bottom_left, Point::new(0.0, 10.0));
        // The missing corner keeps the fallback default.
        assert_eq!(quad.bottom_right, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_corner_order_is_stable() {
        let quad = find_corners(&square_contour(0.0, 0.0, 50.0));
        assert!(quad.top_left.x < quad.top_right.x);
        assert!(quad.top_left.y < quad.bottom_left.y);
        assert!(quad.top_right.y < quad.bottom_right.y);
        assert!(quad.bottom_left.x < quad.bottom_right.x);
    }

    #[test]
    fn test_offset_translates_all_corners() {
        let quad = find_corners(&square_contour(0.0, 0.0, 50.0)).offset(5.0, -3.0);
        assert_near(quad.top_left, 5.0, -3.0);
        assert_near(quad.bottom_right, 55.0, 47.0);
    }
}
