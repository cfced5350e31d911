//! Rotated rectangles and a graded separating-axis overlap measure.

use crate::common::types::{Point2D, Vector2D};

/// A rectangle given by its four corners in counter-clockwise order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    vertices: [Point2D; 4],
}

impl Rectangle {
    /// Build an axis-aligned `width × height` box around `center`, then
    /// rotate it about `center` by `rotation_degrees`.
    pub fn rotated(center: Point2D, width: f64, height: f64, rotation_degrees: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        let (sin_r, cos_r) = rotation_degrees.to_radians().sin_cos();

        const SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        let vertices = SIGNS.map(|(sx, sy)| {
            let local_x = sx * half_width;
            let local_y = sy * half_height;
            Point2D::new(
                center.x + local_x * cos_r - local_y * sin_r,
                center.y + local_x * sin_r + local_y * cos_r,
            )
        });

        Rectangle { vertices }
    }

    /// Corners in winding order.
    pub fn vertices(&self) -> &[Point2D; 4] {
        &self.vertices
    }

    /// Center of the rectangle.
    pub fn center(&self) -> Point2D {
        Point2D::from((self.vertices[0].coords + self.vertices[2].coords) / 2.0)
    }

    /// Unit normals of the rectangle's edges. Opposite edges share an axis,
    /// so only two are needed.
    fn edge_normals(&self) -> impl Iterator<Item = Vector2D> + '_ {
        (0..2).filter_map(move |i| {
            let edge = self.vertices[i + 1] - self.vertices[i];
            Vector2D::new(-edge.y, edge.x).try_normalize(f64::EPSILON)
        })
    }

    /// Interval covered by this rectangle when projected onto `axis`.
    fn project(&self, axis: &Vector2D) -> (f64, f64) {
        self.vertices
            .iter()
            .map(|v| v.coords.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p), hi.max(p))
            })
    }
}

/// Build a rotated rectangle. See [`Rectangle::rotated`].
pub fn rotated_rectangle(
    center: Point2D,
    width: f64,
    height: f64,
    rotation_degrees: f64,
) -> Rectangle {
    Rectangle::rotated(center, width, height, rotation_degrees)
}

/// Graded separating-axis test between two rectangles.
///
/// Projects both rectangles onto every edge normal of either one. If any
/// axis shows no overlap the rectangles are disjoint and the result is 0.
/// Otherwise returns the smallest overlap seen across all axes, which grows
/// with penetration depth. Touching edges count as disjoint.
pub fn separating_width(a: &Rectangle, b: &Rectangle) -> f64 {
    let mut min_overlap = f64::INFINITY;

    for axis in a.edge_normals().chain(b.edge_normals()) {
        let (min_a, max_a) = a.project(&axis);
        let (min_b, max_b) = b.project(&axis);
        let overlap = (max_a.min(max_b) - min_a.max(min_b)).max(0.0);
        if overlap <= 0.0 {
            return 0.0;
        }
        min_overlap = min_overlap.min(overlap);
    }

    if min_overlap.is_finite() {
        min_overlap
    } else {
        // Both rectangles are degenerate points
        0.0
    }
}
