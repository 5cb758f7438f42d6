//! Polygon geometry kernel.
//!
//! Pure, total functions over [`Point`] and [`Polygon`]. Degenerate input
//! (empty or fewer than three vertices) yields a neutral value instead of
//! an error.

use crate::types::{Bounds, Point, Polygon};

/// Axis-aligned bounding box of the polygon's vertices.
///
/// An empty polygon yields the all-zero box.
#[must_use = "returns the bounding box without modifying the polygon"]
pub fn bounds(polygon: &Polygon) -> Bounds {
    let points = polygon.points();
    let Some(first) = points.first() else {
        return Bounds::default();
    };
    points.iter().skip(1).fold(
        Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        },
        |b, p| Bounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        },
    )
}

/// Arithmetic mean of the vertices (not the area-weighted centroid).
///
/// An empty polygon yields the origin.
#[must_use = "returns the centroid without modifying the polygon"]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(polygon: &Polygon) -> Point {
    let points = polygon.points();
    if points.is_empty() {
        return Point::default();
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Horizontal ray-casting parity test.
///
/// Always `false` for polygons with fewer than three vertices. Points
/// exactly on the left or top edges of an axis-aligned polygon count as
/// inside and points on the right or bottom edges as outside, the usual
/// half-open convention of the parity test.
#[must_use]
pub fn point_in_polygon(point: Point, polygon: &Polygon) -> bool {
    if !polygon.is_region() {
        return false;
    }
    let points = polygon.points();
    let mut inside = false;
    let mut j = points.len() - 1;
    for (i, pi) in points.iter().enumerate() {
        let pj = points[j];
        let crosses = (pi.y > point.y) != (pj.y > point.y);
        if crosses && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from `point` to the segment `start..end`.
///
/// The projection parameter is clamped to the segment, so points beyond an
/// endpoint measure to that endpoint. A zero-length segment measures to
/// `start`.
#[must_use]
pub fn distance_point_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let a = point.x - start.x;
    let b = point.y - start.y;
    let c = end.x - start.x;
    let d = end.y - start.y;

    let dot = a.mul_add(c, b * d);
    let len_sq = c.mul_add(c, d * d);
    let param = if len_sq == 0.0 { -1.0 } else { dot / len_sq };

    let nearest = if param < 0.0 {
        start
    } else if param > 1.0 {
        end
    } else {
        Point::new(param.mul_add(c, start.x), param.mul_add(d, start.y))
    };
    point.distance(nearest)
}

/// Absolute shoelace area. Zero for fewer than three vertices.
#[must_use]
pub fn polygon_area(polygon: &Polygon) -> f64 {
    if !polygon.is_region() {
        return 0.0;
    }
    let twice: f64 = polygon
        .edges()
        .map(|(p, q)| p.x.mul_add(q.y, -(q.x * p.y)))
        .sum();
    twice.abs() / 2.0
}

/// Rotate `point` about `center` by `angle_degrees` (counter-clockwise in a
/// y-up frame, clockwise on screen where y grows downward).
#[must_use]
pub fn rotate_point(point: Point, center: Point, angle_degrees: f64) -> Point {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(
        center.x + dx.mul_add(cos, -(dy * sin)),
        center.y + dx.mul_add(sin, dy * cos),
    )
}
