//! Real roots of low-degree polynomials.
//!
//! Coefficients are given in ascending order, so `[c0, c1, c2, c3]` is
//! `c0 + c1·t + c2·t² + c3·t³`.

use std::f64::consts::TAU;

/// Leading coefficients smaller than this (relative to the largest
/// coefficient) are treated as zero and the degree is reduced.
const COEFFICIENT_EPSILON: f64 = 1e-12;

/// Relative discriminant below which a cubic is treated as having a
/// repeated root.
const DISCRIMINANT_EPSILON: f64 = 1e-12;

/// Roots closer than this are reported once.
const DUPLICATE_ROOT_EPSILON: f64 = 1e-10;

const NEWTON_POLISH_ITERATIONS: usize = 3;

/// Real roots of a polynomial.
#[derive(Debug, Clone, PartialEq)]
pub enum RealRoots {
    /// The polynomial is identically zero, so every parameter is a root.
    Unconstrained,
    /// The polynomial has finitely many real roots, sorted ascending.
    Finite(Vec<f64>),
}

impl RealRoots {
    /// Roots lying in `[lower, upper]`. Empty for `Unconstrained`.
    pub fn within(&self, lower: f64, upper: f64) -> Vec<f64> {
        match self {
            Self::Unconstrained => Vec::new(),
            Self::Finite(roots) => roots
                .iter()
                .copied()
                .filter(|t| *t >= lower && *t <= upper)
                .collect(),
        }
    }
}

/// Evaluate an ascending-order cubic with Horner's rule.
pub fn evaluate_cubic(coefficients: &[f64; 4], t: f64) -> f64 {
    let [c0, c1, c2, c3] = *coefficients;
    ((c3 * t + c2) * t + c1) * t + c0
}

/// First derivative of an ascending-order cubic.
pub fn evaluate_cubic_derivative(coefficients: &[f64; 4], t: f64) -> f64 {
    let [_, c1, c2, c3] = *coefficients;
    (3.0 * c3 * t + 2.0 * c2) * t + c1
}

/// Find all real roots of `c0 + c1·t + c2·t² + c3·t³`.
///
/// Uses the closed-form (Cardano / trigonometric) solution, then polishes
/// each root with a few Newton steps on the original polynomial.
pub fn cubic_roots(coefficients: [f64; 4]) -> RealRoots {
    let [d, c, b, a] = coefficients;
    let scale = coefficients.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return RealRoots::Unconstrained;
    }
    let eps = COEFFICIENT_EPSILON * scale;

    let mut roots = if a.abs() > eps {
        depressed_cubic_roots(b / a, c / a, d / a)
    } else if b.abs() > eps {
        quadratic_roots(b, c, d)
    } else if c.abs() > eps {
        vec![-d / c]
    } else {
        // Non-zero constant
        Vec::new()
    };

    for root in roots.iter_mut() {
        *root = newton_polish(&coefficients, *root);
    }

    roots.retain(|t| t.is_finite());
    roots.sort_by(|x, y| x.total_cmp(y));
    roots.dedup_by(|x, y| (*x - *y).abs() <= DUPLICATE_ROOT_EPSILON);
    RealRoots::Finite(roots)
}

/// Roots of the monic cubic `t³ + p·t² + q·t + r`.
fn depressed_cubic_roots(p: f64, q: f64, r: f64) -> Vec<f64> {
    // Substitute t = s - p/3 to get s³ + P·s + Q = 0
    let shift = p / 3.0;
    let depressed_p = q - p * p / 3.0;
    let depressed_q = 2.0 * p * p * p / 27.0 - p * q / 3.0 + r;

    let half_q = depressed_q / 2.0;
    let third_p = depressed_p / 3.0;
    let discriminant = half_q * half_q + third_p * third_p * third_p;
    let magnitude = half_q * half_q + (third_p * third_p * third_p).abs();

    let depressed_roots = if discriminant > DISCRIMINANT_EPSILON * magnitude {
        let sqrt_disc = discriminant.sqrt();
        vec![(-half_q + sqrt_disc).cbrt() + (-half_q - sqrt_disc).cbrt()]
    } else if depressed_p < 0.0 {
        let radius = 2.0 * (-third_p).sqrt();
        let cos_arg = ((3.0 * depressed_q) / (2.0 * depressed_p) * (-3.0 / depressed_p).sqrt())
            .clamp(-1.0, 1.0);
        let phi = cos_arg.acos() / 3.0;
        (0..3)
            .map(|k| radius * (phi - TAU * k as f64 / 3.0).cos())
            .collect()
    } else {
        // Triple root
        vec![0.0]
    };

    depressed_roots.into_iter().map(|s| s - shift).collect()
}

/// Roots of `a·t² + b·t + c` with `a` known to be non-negligible.
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let discriminant = b * b - 4.0 * a * c;
    let tolerance = DISCRIMINANT_EPSILON * (b * b).max((4.0 * a * c).abs());

    if discriminant < -tolerance {
        Vec::new()
    } else if discriminant <= tolerance {
        vec![-b / (2.0 * a)]
    } else {
        // Avoids cancellation between -b and the square root
        let q = -0.5 * (b + b.signum() * discriminant.sqrt());
        let mut roots = vec![q / a];
        if q != 0.0 {
            roots.push(c / q);
        }
        roots
    }
}

fn newton_polish(coefficients: &[f64; 4], mut t: f64) -> f64 {
    for _ in 0..NEWTON_POLISH_ITERATIONS {
        let value = evaluate_cubic(coefficients, t);
        let slope = evaluate_cubic_derivative(coefficients, t);
        if slope == 0.0 {
            break;
        }
        let next = t - value / slope;
        if !next.is_finite() || evaluate_cubic(coefficients, next).abs() > value.abs() {
            break;
        }
        t = next;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn finite(roots: RealRoots) -> Vec<f64> {
        match roots {
            RealRoots::Finite(r) => r,
            RealRoots::Unconstrained => panic!("expected finitely many roots"),
        }
    }

    #[test]
    fn three_distinct_roots() {
        // (t - 0.2)(t - 0.5)(t - 0.9)
        let roots = finite(cubic_roots([-0.09, 0.73, -1.6, 1.0]));
        assert_eq!(roots.len(), 3);
        assert_relative_eq!(roots[0], 0.2, epsilon = 1e-10);
        assert_relative_eq!(roots[1], 0.5, epsilon = 1e-10);
        assert_relative_eq!(roots[2], 0.9, epsilon = 1e-10);
    }

    #[test]
    fn single_real_root() {
        // (t - 2)(t² + 1)
        let roots = finite(cubic_roots([-2.0, 1.0, -2.0, 1.0]));
        assert_eq!(roots.len(), 1);
        assert_relative_eq!(roots[0], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn repeated_root_reported_once() {
        // (t - 1)²(t + 2)
        let roots = finite(cubic_roots([2.0, -3.0, 0.0, 1.0]));
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], -2.0, epsilon = 1e-8);
        assert_relative_eq!(roots[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn degree_drops_to_quadratic_and_linear() {
        // (2t - 1)(t - 1)
        let roots = finite(cubic_roots([1.0, -3.0, 2.0, 0.0]));
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(roots[1], 1.0, epsilon = 1e-12);

        let roots = finite(cubic_roots([-1.0, 2.0, 0.0, 0.0]));
        assert_eq!(roots, vec![0.5]);
    }

    #[test]
    fn constant_polynomials() {
        assert_eq!(cubic_roots([0.0; 4]), RealRoots::Unconstrained);
        assert_eq!(cubic_roots([3.0, 0.0, 0.0, 0.0]), RealRoots::Finite(vec![]));
    }

    #[test]
    fn within_filters_by_interval() {
        let roots = cubic_roots([-0.09, 0.73, -1.6, 1.0]);
        let inside = roots.within(0.3, 1.0);
        assert_eq!(inside.len(), 2);
        assert!(RealRoots::Unconstrained.within(0.0, 1.0).is_empty());
    }
}
