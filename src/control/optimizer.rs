//! Bound-constrained derivative-free minimization
//!
//! A Nelder-Mead simplex search where every trial point is projected back
//! into the box bounds. The objective is treated as a black box: no
//! gradients, and NaN values are ranked as infinitely bad.

use rayon::prelude::*;
use tracing::debug;

use crate::config::OptimizerSettings;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// A scalar function to minimize over `N` bounded variables
pub trait Objective<const N: usize>: Sync {
    fn evaluate(&self, x: &[f64; N]) -> f64;
}

impl<const N: usize, F> Objective<N> for F
where
    F: Fn(&[f64; N]) -> f64 + Sync,
{
    fn evaluate(&self, x: &[f64; N]) -> f64 {
        self(x)
    }
}

/// Best point found by a minimization run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationOutcome<const N: usize> {
    pub point: [f64; N],
    pub value: f64,
    /// Objective at the (projected) initial guess
    pub initial_value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// Whether the tolerances were met before the iteration cap
    pub converged: bool,
}

impl<const N: usize> OptimizationOutcome<N> {
    /// Whether the search found anything better than the initial guess
    pub fn improved(&self) -> bool {
        self.value < self.initial_value
    }
}

/// Nelder-Mead simplex search restricted to a box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedNelderMead<const N: usize> {
    lower: [f64; N],
    upper: [f64; N],
    settings: OptimizerSettings,
}

impl<const N: usize> BoundedNelderMead<N> {
    pub fn new(lower: [f64; N], upper: [f64; N], settings: OptimizerSettings) -> Self {
        BoundedNelderMead {
            lower,
            upper,
            settings,
        }
    }

    /// Project `x` into the bounds
    pub fn clamp(&self, x: &[f64; N]) -> [f64; N] {
        std::array::from_fn(|i| x[i].clamp(self.lower[i], self.upper[i]))
    }

    /// Minimize `objective` starting from `initial`.
    ///
    /// The run is deterministic for a given input, and the returned point
    /// is never worse than the projected initial guess.
    pub fn minimize<F: Objective<N>>(
        &self,
        objective: &F,
        initial: &[f64; N],
    ) -> OptimizationOutcome<N> {
        let evaluate = |x: &[f64; N]| {
            let value = objective.evaluate(x);
            if value.is_nan() {
                f64::INFINITY
            } else {
                value
            }
        };

        let start = self.clamp(initial);
        let mut simplex = self.initial_simplex(&start);
        let mut values: Vec<f64> = simplex.par_iter().map(|x| evaluate(x)).collect();
        let mut evaluations = simplex.len();
        let initial_value = values[0];

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.settings.max_iterations {
            order(&mut simplex, &mut values);
            if self.has_converged(&simplex, &values) {
                converged = true;
                break;
            }
            iterations += 1;

            let worst = simplex[N];
            let worst_value = values[N];
            let centroid = centroid(&simplex[..N]);

            let reflected = self.clamp(&along(&centroid, &worst, -REFLECTION));
            let reflected_value = evaluate(&reflected);
            evaluations += 1;

            if reflected_value < values[0] {
                let expanded = self.clamp(&along(&centroid, &reflected, EXPANSION));
                let expanded_value = evaluate(&expanded);
                evaluations += 1;

                if expanded_value < reflected_value {
                    simplex[N] = expanded;
                    values[N] = expanded_value;
                } else {
                    simplex[N] = reflected;
                    values[N] = reflected_value;
                }
                continue;
            }

            if reflected_value < values[N - 1] {
                simplex[N] = reflected;
                values[N] = reflected_value;
                continue;
            }

            // Contract toward the better of the reflected and worst points
            let (contracted, target) = if reflected_value < worst_value {
                (
                    self.clamp(&along(&centroid, &reflected, CONTRACTION)),
                    reflected_value,
                )
            } else {
                (self.clamp(&along(&centroid, &worst, CONTRACTION)), worst_value)
            };
            let contracted_value = evaluate(&contracted);
            evaluations += 1;

            if contracted_value < target {
                simplex[N] = contracted;
                values[N] = contracted_value;
                continue;
            }

            // Shrink everything toward the best vertex
            let best = simplex[0];
            let shrunk: Vec<([f64; N], f64)> = simplex[1..]
                .par_iter()
                .map(|x| {
                    let moved = self.clamp(&along(&best, x, SHRINK));
                    (moved, evaluate(&moved))
                })
                .collect();
            evaluations += shrunk.len();
            for (i, (x, value)) in shrunk.into_iter().enumerate() {
                simplex[i + 1] = x;
                values[i + 1] = value;
            }
        }

        order(&mut simplex, &mut values);
        debug!(
            iterations,
            evaluations,
            converged,
            best = values[0],
            initial = initial_value,
            "Simplex search finished"
        );

        OptimizationOutcome {
            point: simplex[0],
            value: values[0],
            initial_value,
            iterations,
            evaluations,
            converged,
        }
    }

    /// `start` plus one vertex per axis, stepped a fraction of the bound
    /// range and flipped inward when the step would leave the box
    fn initial_simplex(&self, start: &[f64; N]) -> Vec<[f64; N]> {
        let mut simplex = Vec::with_capacity(N + 1);
        simplex.push(*start);
        for i in 0..N {
            let range = self.upper[i] - self.lower[i];
            let mut step = self.settings.initial_step_fraction * range;
            if start[i] + step > self.upper[i] {
                step = -step;
            }
            let mut vertex = *start;
            vertex[i] = (start[i] + step).clamp(self.lower[i], self.upper[i]);
            simplex.push(vertex);
        }
        simplex
    }

    fn has_converged(&self, simplex: &[[f64; N]], values: &[f64]) -> bool {
        let spread = values[N] - values[0];
        if !(spread <= self.settings.value_tolerance) {
            return false;
        }
        let best = &simplex[0];
        simplex[1..].iter().all(|x| {
            x.iter()
                .zip(best)
                .all(|(a, b)| (a - b).abs() <= self.settings.parameter_tolerance)
        })
    }
}

/// Sort vertices by value, best first. Ties keep their previous order.
fn order<const N: usize>(simplex: &mut [[f64; N]], values: &mut [f64]) {
    let mut ranked: Vec<([f64; N], f64)> = simplex
        .iter()
        .copied()
        .zip(values.iter().copied())
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (i, (x, value)) in ranked.into_iter().enumerate() {
        simplex[i] = x;
        values[i] = value;
    }
}

fn centroid<const N: usize>(vertices: &[[f64; N]]) -> [f64; N] {
    let count = vertices.len() as f64;
    std::array::from_fn(|i| vertices.iter().map(|x| x[i]).sum::<f64>() / count)
}

/// `from + factor · (to − from)`
fn along<const N: usize>(from: &[f64; N], to: &[f64; N], factor: f64) -> [f64; N] {
    std::array::from_fn(|i| from[i] + factor * (to[i] - from[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settings() -> OptimizerSettings {
        OptimizerSettings {
            max_iterations: 2000,
            ..OptimizerSettings::default()
        }
    }

    #[test]
    fn finds_interior_minimum() {
        let optimizer = BoundedNelderMead::new([-5.0, -5.0], [5.0, 5.0], settings());
        let bowl = |x: &[f64; 2]| (x[0] - 1.0).powi(2) + 2.0 * (x[1] + 2.0).powi(2);
        let outcome = optimizer.minimize(&bowl, &[4.0, 4.0]);
        assert!(outcome.converged);
        assert!(outcome.improved());
        assert_relative_eq!(outcome.point[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(outcome.point[1], -2.0, epsilon = 1e-4);
    }

    #[test]
    fn minimum_outside_box_lands_on_bound() {
        let optimizer = BoundedNelderMead::new([0.0, 0.0], [1.0, 1.0], settings());
        let slope = |x: &[f64; 2]| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2);
        let outcome = optimizer.minimize(&slope, &[0.5, 0.5]);
        assert_relative_eq!(outcome.point[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(outcome.point[1], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn initial_guess_is_projected() {
        let optimizer = BoundedNelderMead::new([0.0], [1.0], settings());
        let flat = |_: &[f64; 1]| 7.0;
        let outcome = optimizer.minimize(&flat, &[5.0]);
        assert_eq!(outcome.point, [1.0]);
        assert_eq!(outcome.value, 7.0);
        assert!(!outcome.improved());
    }

    #[test]
    fn nan_values_are_never_preferred() {
        let optimizer = BoundedNelderMead::new([-1.0, -1.0], [1.0, 1.0], settings());
        let holey = |x: &[f64; 2]| {
            if x[0] > 0.2 {
                f64::NAN
            } else {
                x[0].powi(2) + x[1].powi(2)
            }
        };
        let outcome = optimizer.minimize(&holey, &[-0.8, 0.6]);
        assert!(outcome.value.is_finite());
        assert!(outcome.point[0] <= 0.2);
        assert!(outcome.value <= outcome.initial_value);
    }

    #[test]
    fn iteration_cap_still_returns_best_point() {
        let capped = OptimizerSettings {
            max_iterations: 3,
            ..OptimizerSettings::default()
        };
        let optimizer = BoundedNelderMead::new([-5.0; 3], [5.0; 3], capped);
        let bowl = |x: &[f64; 3]| x.iter().map(|v| v * v).sum::<f64>();
        let outcome = optimizer.minimize(&bowl, &[3.0, -2.0, 1.0]);
        assert_eq!(outcome.iterations, 3);
        assert!(!outcome.converged);
        assert!(outcome.value <= outcome.initial_value);
    }

    #[test]
    fn runs_are_deterministic() {
        let optimizer = BoundedNelderMead::new([-2.0; 4], [2.0; 4], settings());
        let rosenbrock = |x: &[f64; 4]| {
            (0..3)
                .map(|i| 100.0 * (x[i + 1] - x[i] * x[i]).powi(2) + (1.0 - x[i]).powi(2))
                .sum::<f64>()
        };
        let first = optimizer.minimize(&rosenbrock, &[-1.0, 0.5, 1.5, -0.5]);
        let second = optimizer.minimize(&rosenbrock, &[-1.0, 0.5, 1.5, -0.5]);
        assert_eq!(first, second);
    }
}
