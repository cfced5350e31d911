//! Common utilities and types shared across the planner

use std::f64::consts::TAU;

/// Common types used across the codebase
pub mod types {
    /// A 2D point on the field
    pub type Point2D = nalgebra::Point2<f64>;

    /// A 2D displacement or tangent vector
    pub type Vector2D = nalgebra::Vector2<f64>;
}

/// Wrap an angle into [0, 2pi]
pub fn wrap_to_tau(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    wrapped.min(TAU)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn wrap_to_tau_keeps_headings_non_negative() {
        assert_relative_eq!(wrap_to_tau(-PI / 2.0), 3.0 * PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_to_tau(PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert!(wrap_to_tau(-1e-18) <= TAU);
    }
}
