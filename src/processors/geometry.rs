//! Geometric primitives for detection post-processing.
//!
//! Provides the oriented text box produced by the detector, plus the contour
//! algorithms it is computed with: shoelace area, perimeter, convex hull, and
//! the rotating-calipers minimum-area rectangle.

use imageproc::contours::Contour;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f32::consts::PI;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate.
    pub x: f32,
    /// Y-coordinate.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rotated rectangle described by center, size, and angle in degrees.
///
/// The angle is normalized to `[0, 90)`; a rectangle at 95° is represented as
/// the same rectangle with width and height swapped at 5°. Boxes are ordered
/// by `(center.y, center.x)` ascending, the reading order the detector emits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrientedBox {
    /// Center of the rectangle.
    pub center: Point,
    /// Side length along the (rotated) x-axis.
    pub width: f32,
    /// Side length along the (rotated) y-axis.
    pub height: f32,
    /// Rotation in degrees, normalized to `[0, 90)`.
    pub angle: f32,
}

impl OrientedBox {
    /// Creates an oriented box, normalizing the angle into `[0, 90)`.
    pub fn new(center: Point, width: f32, height: f32, angle: f32) -> Self {
        let mut angle = angle.rem_euclid(180.0);
        let (mut width, mut height) = (width, height);
        if angle >= 90.0 {
            std::mem::swap(&mut width, &mut height);
            angle -= 90.0;
        }
        Self {
            center,
            width,
            height,
            angle,
        }
    }

    /// Length of the shorter side.
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Whether the box is wider than it is tall.
    pub fn is_wide(&self) -> bool {
        self.width > self.height
    }

    /// The four corners, rotated around the center: the corners of the
    /// unrotated rectangle in order top-left, top-right, bottom-right,
    /// bottom-left, each rotated by `angle`.
    pub fn corner_points(&self) -> [Point; 4] {
        let rad = self.angle * PI / 180.0;
        let (sin, cos) = rad.sin_cos();
        let (w2, h2) = (self.width / 2.0, self.height / 2.0);
        let corners = [(-w2, -h2), (w2, -h2), (w2, h2), (-w2, h2)];
        corners.map(|(x, y)| {
            Point::new(
                x * cos - y * sin + self.center.x,
                x * sin + y * cos + self.center.y,
            )
        })
    }

    /// Axis-aligned bounds as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_rect(&self) -> (f32, f32, f32, f32) {
        let corners = self.corner_points();
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in corners {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        (min_x, min_y, max_x, max_y)
    }

    /// Returns a copy enlarged by `margin` on each side of both axes
    /// (width and height grow by `2 * margin`).
    pub fn enlarged(&self, margin: f32) -> Self {
        Self {
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
            ..*self
        }
    }

    /// Returns a copy with center and size scaled by `(sx, sy)`.
    ///
    /// Each side is scaled by the factor along its own direction: a segment
    /// at angle `a` stretches by `sqrt((sx*cos a)^2 + (sy*sin a)^2)`. The
    /// angle is unchanged.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let width_factor = ((sx * cos).powi(2) + (sy * sin).powi(2)).sqrt();
        let height_factor = ((sx * sin).powi(2) + (sy * cos).powi(2)).sqrt();
        Self {
            center: Point::new(self.center.x * sx, self.center.y * sy),
            width: self.width * width_factor,
            height: self.height * height_factor,
            angle: self.angle,
        }
    }

    /// Reading-order comparison: ascending `(center.y, center.x)`.
    pub fn reading_order(&self, other: &Self) -> Ordering {
        (self.center.y, self.center.x)
            .partial_cmp(&(other.center.y, other.center.x))
            .unwrap_or(Ordering::Equal)
    }
}

/// Converts an imageproc contour into float points.
pub fn contour_points(contour: &Contour<u32>) -> Vec<Point> {
    contour
        .points
        .iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect()
}

/// Polygon area via the shoelace formula. Zero for fewer than 3 points.
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    area.abs() / 2.0
}

/// Closed-polygon perimeter.
pub fn polygon_perimeter(points: &[Point]) -> f32 {
    let n = points.len();
    let mut perimeter = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        perimeter += (points[j].x - points[i].x).hypot(points[j].y - points[i].y);
    }
    perimeter
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull via Graham scan. Returns the input unchanged for fewer than
/// 3 points.
fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut points = points.to_vec();
    let mut start = 0;
    for i in 1..points.len() {
        if points[i].y < points[start].y
            || (points[i].y == points[start].y && points[i].x < points[start].x)
        {
            start = i;
        }
    }
    points.swap(0, start);
    let pivot = points[0];

    points[1..].sort_by(|a, b| {
        let c = cross(pivot, *a, *b);
        if c == 0.0 {
            let da = (a.x - pivot.x).powi(2) + (a.y - pivot.y).powi(2);
            let db = (b.x - pivot.x).powi(2) + (b.y - pivot.y).powi(2);
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        } else if c > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    });

    let mut hull: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        while hull.len() > 1 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull
}

/// Minimum-area oriented rectangle of a point set, via rotating calipers on
/// the convex hull. Degenerate inputs collapse to an axis-aligned bounds box.
pub fn min_area_rect(points: &[Point]) -> OrientedBox {
    let hull = convex_hull(points);

    if hull.len() < 3 {
        let (min_x, max_x) = match points.iter().map(|p| p.x).minmax().into_option() {
            Some(pair) => pair,
            None => return OrientedBox::new(Point::new(0.0, 0.0), 0.0, 0.0, 0.0),
        };
        let (min_y, max_y) = match points.iter().map(|p| p.y).minmax().into_option() {
            Some(pair) => pair,
            None => return OrientedBox::new(Point::new(0.0, 0.0), 0.0, 0.0, 0.0),
        };
        return OrientedBox::new(
            Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            max_x - min_x,
            max_y - min_y,
            0.0,
        );
    }

    let n = hull.len();
    let mut best_area = f32::MAX;
    let mut best = OrientedBox::new(Point::new(0.0, 0.0), 0.0, 0.0, 0.0);

    for i in 0..n {
        let j = (i + 1) % n;
        let ex = hull[j].x - hull[i].x;
        let ey = hull[j].y - hull[i].y;
        let len = (ex * ex + ey * ey).sqrt();
        if len < f32::EPSILON {
            continue;
        }
        let (nx, ny) = (ex / len, ey / len);
        let (px, py) = (-ny, nx);

        let mut min_n = f32::MAX;
        let mut max_n = f32::MIN;
        let mut min_p = f32::MAX;
        let mut max_p = f32::MIN;
        for p in &hull {
            let dn = nx * (p.x - hull[i].x) + ny * (p.y - hull[i].y);
            let dp = px * (p.x - hull[i].x) + py * (p.y - hull[i].y);
            min_n = min_n.min(dn);
            max_n = max_n.max(dn);
            min_p = min_p.min(dp);
            max_p = max_p.max(dp);
        }

        let width = max_n - min_n;
        let height = max_p - min_p;
        let area = width * height;
        if area < best_area {
            best_area = area;
            let cn = (min_n + max_n) / 2.0;
            let cp = (min_p + max_p) / 2.0;
            best = OrientedBox::new(
                Point::new(
                    hull[i].x + cn * nx + cp * px,
                    hull[i].y + cn * ny + cp * py,
                ),
                width,
                height,
                f32::atan2(ny, nx) * 180.0 / PI,
            );
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoelace_area_of_unit_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!((polygon_area(&square) - 1.0).abs() < 1e-6);
        assert!((polygon_perimeter(&square) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn min_area_rect_of_axis_aligned_points() {
        let points = vec![
            Point::new(2.0, 3.0),
            Point::new(8.0, 3.0),
            Point::new(8.0, 5.0),
            Point::new(2.0, 5.0),
        ];
        let rect = min_area_rect(&points);
        assert!((rect.center.x - 5.0).abs() < 1e-4);
        assert!((rect.center.y - 4.0).abs() < 1e-4);
        assert!((rect.width.max(rect.height) - 6.0).abs() < 1e-3);
        assert!((rect.width.min(rect.height) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn min_area_rect_of_rotated_points() {
        // A 10x2 rectangle rotated 30 degrees around the origin.
        let rad = 30.0_f32.to_radians();
        let (s, c) = rad.sin_cos();
        let corners = [(-5.0, -1.0), (5.0, -1.0), (5.0, 1.0), (-5.0, 1.0)];
        let points: Vec<Point> = corners
            .iter()
            .map(|(x, y)| Point::new(x * c - y * s, x * s + y * c))
            .collect();

        let rect = min_area_rect(&points);
        assert!((rect.width.max(rect.height) - 10.0).abs() < 1e-2);
        assert!((rect.width.min(rect.height) - 2.0).abs() < 1e-2);
        assert!((rect.angle - 30.0).abs() < 0.5);
    }

    #[test]
    fn angle_normalization_swaps_sides() {
        let rect = OrientedBox::new(Point::new(0.0, 0.0), 4.0, 2.0, 120.0);
        assert!((0.0..90.0).contains(&rect.angle));
        assert!((rect.angle - 30.0).abs() < 1e-4);
        assert_eq!(rect.width, 2.0);
        assert_eq!(rect.height, 4.0);
    }

    #[test]
    fn enlarged_grows_both_sides() {
        let rect = OrientedBox::new(Point::new(0.0, 0.0), 4.0, 2.0, 0.0);
        let grown = rect.enlarged(1.5);
        assert_eq!(grown.width, 7.0);
        assert_eq!(grown.height, 5.0);
        assert_eq!(grown.center, rect.center);
    }

    #[test]
    fn scaled_applies_per_axis_factors() {
        let rect = OrientedBox::new(Point::new(10.0, 20.0), 4.0, 2.0, 0.0);
        let scaled = rect.scaled(2.0, 3.0);
        assert_eq!(scaled.center.x, 20.0);
        assert_eq!(scaled.center.y, 60.0);
        // At angle 0 the width follows sx and the height follows sy.
        assert!((scaled.width - 8.0).abs() < 1e-5);
        assert!((scaled.height - 6.0).abs() < 1e-5);

        // A box rotated onto the y-axis scales the other way around.
        let upright = OrientedBox::new(Point::new(0.0, 0.0), 4.0, 2.0, 89.9);
        let scaled = upright.scaled(2.0, 3.0);
        assert!((scaled.width - 12.0).abs() < 0.05);
        assert!((scaled.height - 4.0).abs() < 0.05);

        // Equal factors scale both sides uniformly at any angle.
        let tilted = OrientedBox::new(Point::new(1.0, 1.0), 5.0, 3.0, 30.0);
        let scaled = tilted.scaled(2.0, 2.0);
        assert!((scaled.width - 10.0).abs() < 1e-4);
        assert!((scaled.height - 6.0).abs() < 1e-4);
    }

    #[test]
    fn reading_order_sorts_by_row_then_column() {
        let a = OrientedBox::new(Point::new(10.0, 5.0), 1.0, 1.0, 0.0);
        let b = OrientedBox::new(Point::new(2.0, 8.0), 1.0, 1.0, 0.0);
        let c = OrientedBox::new(Point::new(1.0, 5.0), 1.0, 1.0, 0.0);
        let mut boxes = vec![a, b, c];
        boxes.sort_by(|x, y| x.reading_order(y));
        assert_eq!(boxes[0].center.x, 1.0);
        assert_eq!(boxes[1].center.x, 10.0);
        assert_eq!(boxes[2].center.x, 2.0);
    }

    #[test]
    fn corner_points_of_unrotated_box() {
        let rect = OrientedBox::new(Point::new(5.0, 5.0), 4.0, 2.0, 0.0);
        let [tl, tr, br, bl] = rect.corner_points();
        assert_eq!((tl.x, tl.y), (3.0, 4.0));
        assert_eq!((tr.x, tr.y), (7.0, 4.0));
        assert_eq!((br.x, br.y), (7.0, 6.0));
        assert_eq!((bl.x, bl.y), (3.0, 6.0));
    }
}
