//! Cubic Bézier path segments.
//!
//! A segment runs from a fixed start `p0` to a fixed end `p3`; the two inner
//! control points shape it. Curves are immutable once built: moving a control
//! point means building a new curve, which also resets the cached arc length.

use std::sync::OnceLock;

use super::roots::{cubic_roots, RealRoots};
use crate::common::types::{Point2D, Vector2D};

/// Two root sets are considered to agree when their parameters differ by
/// less than this.
pub const ROOT_MATCH_TOLERANCE: f64 = 1e-6;

/// Number of Simpson intervals used for arc length (must be even).
pub const ARC_LENGTH_INTERVALS: usize = 128;

/// Parameter returned when no root lies on the segment.
pub const DEFAULT_PARAMETER: f64 = 0.5;

// Roots this far outside [0, 1] still count as on the segment
const PARAMETER_SLACK: f64 = 1e-9;

/// How a curve parameter was recovered from a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InversionQuality {
    /// Both coordinate polynomials share a root in [0, 1].
    Matched,
    /// No shared root; the in-range root closest to the point was used.
    NearestRoot,
    /// No root in [0, 1] at all; [`DEFAULT_PARAMETER`] was used.
    Default,
}

/// Result of mapping a point back onto the curve parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inversion {
    /// Recovered curve parameter.
    pub parameter: f64,
    /// How reliable `parameter` is.
    pub quality: InversionQuality,
}

impl Inversion {
    /// True when the inversion had to fall back.
    pub fn is_fallback(&self) -> bool {
        self.quality != InversionQuality::Matched
    }
}

/// A cubic Bézier curve with fixed endpoints.
#[derive(Debug, Clone)]
pub struct CubicCurve {
    p0: Point2D,
    p1: Point2D,
    p2: Point2D,
    p3: Point2D,
    // Power-basis coefficients, ascending: c0 + c1 t + c2 t² + c3 t³
    x_coefficients: [f64; 4],
    y_coefficients: [f64; 4],
    arc_length: OnceLock<f64>,
}

impl CubicCurve {
    /// Create a new curve from its four control points.
    pub fn new(p0: Point2D, p1: Point2D, p2: Point2D, p3: Point2D) -> Self {
        let power_basis = |a: f64, b: f64, c: f64, d: f64| {
            [
                a,
                3.0 * (b - a),
                3.0 * (c - 2.0 * b + a),
                d - 3.0 * c + 3.0 * b - a,
            ]
        };

        CubicCurve {
            p0,
            p1,
            p2,
            p3,
            x_coefficients: power_basis(p0.x, p1.x, p2.x, p3.x),
            y_coefficients: power_basis(p0.y, p1.y, p2.y, p3.y),
            arc_length: OnceLock::new(),
        }
    }

    /// Create a curve from an array of control points.
    pub fn from_control_points(points: [Point2D; 4]) -> Self {
        let [p0, p1, p2, p3] = points;
        Self::new(p0, p1, p2, p3)
    }

    /// Start point.
    pub fn start(&self) -> Point2D {
        self.p0
    }

    /// End point.
    pub fn end(&self) -> Point2D {
        self.p3
    }

    /// Control points in order `[p0, p1, p2, p3]`.
    pub fn control_points(&self) -> [Point2D; 4] {
        [self.p0, self.p1, self.p2, self.p3]
    }

    /// Position at parameter `t`. Values outside [0, 1] extrapolate.
    pub fn position(&self, t: f64) -> Point2D {
        // Bernstein form hits the endpoints exactly at t = 0 and t = 1
        let s = 1.0 - t;
        let b0 = s * s * s;
        let b1 = 3.0 * s * s * t;
        let b2 = 3.0 * s * t * t;
        let b3 = t * t * t;
        Point2D::from(
            self.p0.coords * b0 + self.p1.coords * b1 + self.p2.coords * b2 + self.p3.coords * b3,
        )
    }

    /// Derivative of the position with respect to `t`.
    pub fn tangent(&self, t: f64) -> Vector2D {
        let s = 1.0 - t;
        (self.p1 - self.p0) * (3.0 * s * s)
            + (self.p2 - self.p1) * (6.0 * s * t)
            + (self.p3 - self.p2) * (3.0 * t * t)
    }

    /// Direction of travel at `t`, in radians.
    pub fn heading(&self, t: f64) -> f64 {
        let tangent = self.tangent(t);
        tangent.y.atan2(tangent.x)
    }

    /// Total length of the curve over [0, 1].
    ///
    /// Computed once with composite Simpson quadrature of `|tangent(t)|`
    /// and cached for the lifetime of the curve.
    pub fn arc_length(&self) -> f64 {
        *self.arc_length.get_or_init(|| {
            let n = ARC_LENGTH_INTERVALS;
            let h = 1.0 / n as f64;
            let speed = |t: f64| self.tangent(t).norm();

            let interior: f64 = (1..n)
                .map(|i| {
                    let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
                    weight * speed(i as f64 * h)
                })
                .sum();

            h / 3.0 * (speed(0.0) + interior + speed(1.0))
        })
    }

    /// Recover the parameter `t` at which the curve passes through `point`.
    ///
    /// Solves `x(t) = point.x` and `y(t) = point.y` independently and looks
    /// for a pair of roots within [`ROOT_MATCH_TOLERANCE`] of each other in
    /// [0, 1]. Without a match, the in-range root whose position lies closest
    /// to `point` is used; without any in-range root, [`DEFAULT_PARAMETER`].
    pub fn invert(&self, point: &Point2D) -> Inversion {
        let x_roots = cubic_roots(shifted(self.x_coefficients, point.x));
        let y_roots = cubic_roots(shifted(self.y_coefficients, point.y));

        let in_x = on_segment(&x_roots);
        let in_y = on_segment(&y_roots);

        let matched = match (&x_roots, &y_roots) {
            // Degenerate single-point curve
            (RealRoots::Unconstrained, RealRoots::Unconstrained) => Some(0.0),
            // A constant coordinate carries no information
            (RealRoots::Unconstrained, _) => self.closest_root(point, &in_y),
            (_, RealRoots::Unconstrained) => self.closest_root(point, &in_x),
            _ => closest_pair(&in_x, &in_y),
        };

        if let Some(parameter) = matched {
            return Inversion {
                parameter,
                quality: InversionQuality::Matched,
            };
        }

        let candidates: Vec<f64> = in_x.iter().chain(in_y.iter()).copied().collect();
        match self.closest_root(point, &candidates) {
            Some(parameter) => Inversion {
                parameter,
                quality: InversionQuality::NearestRoot,
            },
            None => Inversion {
                parameter: DEFAULT_PARAMETER,
                quality: InversionQuality::Default,
            },
        }
    }

    fn closest_root(&self, point: &Point2D, candidates: &[f64]) -> Option<f64> {
        candidates
            .iter()
            .copied()
            .map(|t| (t, (self.position(t) - point).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t)
    }
}

impl PartialEq for CubicCurve {
    fn eq(&self, other: &Self) -> bool {
        self.control_points() == other.control_points()
    }
}

fn on_segment(roots: &RealRoots) -> Vec<f64> {
    roots
        .within(-PARAMETER_SLACK, 1.0 + PARAMETER_SLACK)
        .into_iter()
        .map(|t| t.clamp(0.0, 1.0))
        .collect()
}

fn shifted(mut coefficients: [f64; 4], value: f64) -> [f64; 4] {
    coefficients[0] -= value;
    coefficients
}

/// Midpoint of the closest `(x, y)` root pair, if within tolerance.
fn closest_pair(x_roots: &[f64], y_roots: &[f64]) -> Option<f64> {
    x_roots
        .iter()
        .flat_map(|tx| y_roots.iter().map(move |ty| (*tx, *ty)))
        .map(|(tx, ty)| ((tx + ty) / 2.0, (tx - ty).abs()))
        .filter(|(_, gap)| *gap <= ROOT_MATCH_TOLERANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn s_curve() -> CubicCurve {
        CubicCurve::new(
            Point2D::new(10.0, 5.0),
            Point2D::new(40.0, 30.0),
            Point2D::new(-5.0, 80.0),
            Point2D::new(10.0, 110.0),
        )
    }

    fn straight_line() -> CubicCurve {
        CubicCurve::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 2.0),
            Point2D::new(2.0, 4.0),
            Point2D::new(3.0, 6.0),
        )
    }

    #[test]
    fn endpoints_are_exact() {
        let curve = s_curve();
        assert_eq!(curve.position(0.0), Point2D::new(10.0, 5.0));
        assert_eq!(curve.position(1.0), Point2D::new(10.0, 110.0));
    }

    #[test]
    fn tangent_matches_central_difference() {
        let curve = s_curve();
        let h = 1e-5;
        for i in 1..20 {
            let t = i as f64 / 20.0;
            let numeric = (curve.position(t + h) - curve.position(t - h)) / (2.0 * h);
            let analytic = curve.tangent(t);
            assert_relative_eq!(numeric.x, analytic.x, epsilon = 1e-4);
            assert_relative_eq!(numeric.y, analytic.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn position_extrapolates_outside_unit_interval() {
        let curve = straight_line();
        let beyond = curve.position(2.0);
        assert_relative_eq!(beyond.x, 6.0, epsilon = 1e-12);
        assert_relative_eq!(beyond.y, 12.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_arc_length_is_chord_length() {
        let curve = straight_line();
        assert_relative_eq!(curve.arc_length(), 45.0_f64.sqrt(), epsilon = 1e-3);

        let uneven = CubicCurve::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(0.0, 70.0),
            Point2D::new(0.0, 100.0),
        );
        assert_relative_eq!(uneven.arc_length(), 100.0, epsilon = 1e-3);
    }

    #[test]
    fn arc_length_is_cached() {
        let curve = s_curve();
        let first = curve.arc_length();
        assert_eq!(first, curve.arc_length());
        assert!(first > 105.0);
    }

    #[test]
    fn invert_recovers_parameter_on_curve() {
        let curve = s_curve();
        for t in [0.0, 0.1, 0.37, 0.5, 0.82, 1.0] {
            let inversion = curve.invert(&curve.position(t));
            assert_eq!(inversion.quality, InversionQuality::Matched);
            assert_relative_eq!(inversion.parameter, t, epsilon = 1e-6);
        }
    }

    #[test]
    fn invert_handles_constant_coordinate() {
        let vertical = CubicCurve::new(
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 30.0),
            Point2D::new(10.0, 60.0),
            Point2D::new(10.0, 90.0),
        );
        let inversion = vertical.invert(&Point2D::new(10.0, 45.0));
        assert_eq!(inversion.quality, InversionQuality::Matched);
        assert_relative_eq!(inversion.parameter, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn invert_off_curve_falls_back_to_nearest_root() {
        let curve = straight_line();
        // Off the line: x root at 0.5, y root at 0.6
        let inversion = curve.invert(&Point2D::new(1.5, 3.6));
        assert_eq!(inversion.quality, InversionQuality::NearestRoot);
        assert!(inversion.is_fallback());
        // position(0.6) = (1.8, 3.6) is nearer than position(0.5) = (1.5, 3.0)
        assert_relative_eq!(inversion.parameter, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn invert_beyond_segment_uses_default() {
        let curve = straight_line();
        let inversion = curve.invert(&Point2D::new(30.0, 60.0));
        assert_eq!(inversion.quality, InversionQuality::Default);
        assert_eq!(inversion.parameter, DEFAULT_PARAMETER);
    }

    #[test]
    fn heading_follows_tangent() {
        let curve = straight_line();
        assert_relative_eq!(curve.heading(0.3), 2.0_f64.atan2(1.0), epsilon = 1e-12);
    }

    #[test]
    fn equality_compares_control_points() {
        assert_eq!(s_curve(), s_curve());
        assert_ne!(s_curve(), straight_line());
    }
}
