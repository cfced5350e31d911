//! Fixed-step integration with dense output
//!
//! [`GillIntegrator`] advances a [`DifferentialEquation`] with Gill's
//! fourth-order Runge-Kutta scheme. The result is a [`DenseTrajectory`]
//! that can be queried at any progress value inside the integrated span by
//! cubic Hermite interpolation between steps.

use std::f64::consts::FRAC_1_SQRT_2;

use tracing::debug;

use super::motion::DifferentialEquation;
use crate::common::types::{Point2D, Vector2D};
use crate::config::IntegratorSettings;
use crate::error::{PlannerError, Result};

// Steps shorter than this fraction of the nominal step are merged into the
// previous one
const STEP_MERGE_FRACTION: f64 = 1e-9;

/// A position sampled from a dense trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub progress: f64,
    pub position: Point2D,
}

/// Continuous output of an integration run
#[derive(Debug, Clone)]
pub struct DenseTrajectory {
    progress: Vec<f64>,
    states: Vec<Point2D>,
    derivatives: Vec<Vector2D>,
    evaluations: usize,
}

impl DenseTrajectory {
    /// First integrated progress value
    pub fn start(&self) -> f64 {
        self.progress.first().copied().unwrap_or(0.0)
    }

    /// Last integrated progress value
    pub fn end(&self) -> f64 {
        self.progress.last().copied().unwrap_or(0.0)
    }

    /// Number of integration steps taken
    pub fn steps(&self) -> usize {
        self.progress.len().saturating_sub(1)
    }

    /// Derivative evaluations spent producing this trajectory
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Final integrated state
    pub fn final_state(&self) -> Option<Point2D> {
        self.states.last().copied()
    }

    /// Interpolated state at `progress`
    pub fn state_at(&self, progress: f64) -> Result<Point2D> {
        let (start, end) = (self.start(), self.end());
        if !(progress >= start && progress <= end) {
            return Err(PlannerError::ProgressOutOfRange {
                progress,
                start,
                end,
            });
        }

        if self.progress.len() < 2 {
            return Ok(self.states[0]);
        }

        // Index of the step whose right node is the first at or past `progress`
        let right = self
            .progress
            .partition_point(|&s| s < progress)
            .clamp(1, self.progress.len() - 1);
        let left = right - 1;

        let h = self.progress[right] - self.progress[left];
        let u = (progress - self.progress[left]) / h;
        let u2 = u * u;
        let u3 = u2 * u;

        let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
        let h10 = u3 - 2.0 * u2 + u;
        let h01 = -2.0 * u3 + 3.0 * u2;
        let h11 = u3 - u2;

        let coords = self.states[left].coords * h00
            + self.derivatives[left] * (h10 * h)
            + self.states[right].coords * h01
            + self.derivatives[right] * (h11 * h);
        Ok(Point2D::from(coords))
    }

    /// `count` evenly spaced samples covering the whole span, endpoints included
    pub fn sample(&self, count: usize) -> Result<Vec<TrajectorySample>> {
        let (start, end) = (self.start(), self.end());
        let last = count.saturating_sub(1).max(1) as f64;

        (0..count)
            .map(|i| {
                // Pin the final sample so rounding never leaves the span
                let progress = if i + 1 == count {
                    end
                } else {
                    start + (end - start) * i as f64 / last
                };
                self.state_at(progress)
                    .map(|position| TrajectorySample { progress, position })
            })
            .collect()
    }
}

/// Counts derivative evaluations against a hard cap
struct BudgetedEquation<'e, E> {
    equation: &'e E,
    max_evaluations: usize,
    used: usize,
}

impl<E: DifferentialEquation> BudgetedEquation<'_, E> {
    fn evaluate(&mut self, progress: f64, state: &Point2D) -> Result<Vector2D> {
        if self.used >= self.max_evaluations {
            return Err(PlannerError::EvaluationBudgetExceeded {
                max_evaluations: self.max_evaluations,
                progress,
            });
        }
        self.used += 1;
        Ok(self.equation.derivative(progress, state))
    }
}

/// Gill's fourth-order Runge-Kutta integrator with a fixed step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GillIntegrator {
    step: f64,
    span: f64,
    max_evaluations: usize,
}

impl GillIntegrator {
    /// Create a new integrator
    pub fn new(step: f64, span: f64, max_evaluations: usize) -> Self {
        GillIntegrator {
            step,
            span,
            max_evaluations,
        }
    }

    /// Create a new integrator from configured settings
    pub fn from_settings(settings: &IntegratorSettings) -> Self {
        Self::new(settings.step, settings.span, settings.max_evaluations)
    }

    /// Progress at which integration stops
    pub fn span(&self) -> f64 {
        self.span
    }

    /// Integrate `equation` from progress 0 to the configured span.
    ///
    /// Fails if the evaluation cap is reached or the state stops being
    /// finite; nothing is truncated silently.
    pub fn integrate<E: DifferentialEquation>(
        &self,
        equation: &E,
        initial: Point2D,
    ) -> Result<DenseTrajectory> {
        let mut budget = BudgetedEquation {
            equation,
            max_evaluations: self.max_evaluations,
            used: 0,
        };

        let mut progress = vec![0.0];
        let mut states = vec![initial];
        let mut derivatives = Vec::new();

        let mut s = 0.0;
        let mut y = initial;
        while s < self.span {
            let mut h = self.step.min(self.span - s);
            if self.span - (s + h) < STEP_MERGE_FRACTION * self.step {
                h = self.span - s;
            }

            let (next, k1) = gill_step(&mut budget, s, &y, h)?;
            s = if h == self.span - s { self.span } else { s + h };
            if !(next.x.is_finite() && next.y.is_finite()) {
                return Err(PlannerError::NonFiniteState { progress: s });
            }

            derivatives.push(k1);
            progress.push(s);
            states.push(next);
            y = next;
        }

        // Derivative at the final node for the last Hermite segment
        derivatives.push(budget.evaluate(s, &y)?);

        debug!(
            steps = progress.len() - 1,
            evaluations = budget.used,
            "Integration finished"
        );

        Ok(DenseTrajectory {
            progress,
            states,
            derivatives,
            evaluations: budget.used,
        })
    }
}

/// One Gill step. Returns the new state and the derivative at the old one.
fn gill_step<E: DifferentialEquation>(
    budget: &mut BudgetedEquation<'_, E>,
    s: f64,
    y: &Point2D,
    h: f64,
) -> Result<(Point2D, Vector2D)> {
    let half = 0.5 * h;

    let k1 = budget.evaluate(s, y)?;
    let k2 = budget.evaluate(s + half, &(*y + k1 * half))?;
    let k3 = budget.evaluate(
        s + half,
        &(*y + k1 * (h * (FRAC_1_SQRT_2 - 0.5)) + k2 * (h * (1.0 - FRAC_1_SQRT_2))),
    )?;
    let k4 = budget.evaluate(
        s + h,
        &(*y - k2 * (h * FRAC_1_SQRT_2) + k3 * (h * (1.0 + FRAC_1_SQRT_2))),
    )?;

    let sqrt2 = std::f64::consts::SQRT_2;
    let increment = (k1 + k2 * (2.0 - sqrt2) + k3 * (2.0 + sqrt2) + k4) * (h / 6.0);
    Ok((*y + increment, k1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// dy/ds = (1, 2s), so y = (s, s²) from the origin
    struct Parabola;

    impl DifferentialEquation for Parabola {
        fn derivative(&self, progress: f64, _state: &Point2D) -> Vector2D {
            Vector2D::new(1.0, 2.0 * progress)
        }
    }

    /// dy/ds = y, so y = y0·e^s
    struct Growth;

    impl DifferentialEquation for Growth {
        fn derivative(&self, _progress: f64, state: &Point2D) -> Vector2D {
            state.coords
        }
    }

    struct Explodes;

    impl DifferentialEquation for Explodes {
        fn derivative(&self, _progress: f64, _state: &Point2D) -> Vector2D {
            Vector2D::new(f64::INFINITY, 0.0)
        }
    }

    #[test]
    fn integrates_polynomial_exactly() {
        let integrator = GillIntegrator::new(0.1, 2.0, 1000);
        let trajectory = integrator
            .integrate(&Parabola, Point2D::origin())
            .unwrap();
        let end = trajectory.final_state().unwrap();
        assert_relative_eq!(end.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(end.y, 4.0, epsilon = 1e-12);
        assert_eq!(trajectory.steps(), 20);
        assert_eq!(trajectory.evaluations(), 20 * 4 + 1);
    }

    #[test]
    fn fourth_order_accuracy_on_exponential() {
        let integrator = GillIntegrator::new(0.01, 1.0, 1000);
        let trajectory = integrator
            .integrate(&Growth, Point2D::new(1.0, 2.0))
            .unwrap();
        let end = trajectory.final_state().unwrap();
        let e = std::f64::consts::E;
        assert_relative_eq!(end.x, e, epsilon = 1e-9);
        assert_relative_eq!(end.y, 2.0 * e, epsilon = 1e-9);
    }

    #[test]
    fn last_step_lands_on_span() {
        let integrator = GillIntegrator::new(0.3, 1.0, 1000);
        let trajectory = integrator
            .integrate(&Parabola, Point2D::origin())
            .unwrap();
        assert_eq!(trajectory.end(), 1.0);
        assert_eq!(trajectory.steps(), 4);
    }

    #[test]
    fn dense_output_interpolates_between_steps() {
        let integrator = GillIntegrator::new(0.25, 2.0, 1000);
        let trajectory = integrator
            .integrate(&Parabola, Point2D::origin())
            .unwrap();
        // Hermite interpolation reproduces cubics exactly
        let mid = trajectory.state_at(1.1).unwrap();
        assert_relative_eq!(mid.x, 1.1, epsilon = 1e-12);
        assert_relative_eq!(mid.y, 1.21, epsilon = 1e-12);
    }

    #[test]
    fn samples_cover_span_evenly() {
        let integrator = GillIntegrator::new(0.05, 3.0, 1000);
        let trajectory = integrator
            .integrate(&Parabola, Point2D::origin())
            .unwrap();
        let samples = trajectory.sample(7).unwrap();
        assert_eq!(samples.len(), 7);
        assert_eq!(samples[0].progress, 0.0);
        assert_eq!(samples[6].progress, 3.0);
        assert_relative_eq!(samples[2].progress, 1.0, epsilon = 1e-12);
        assert_relative_eq!(samples[2].position.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn queries_outside_span_are_rejected() {
        let integrator = GillIntegrator::new(0.1, 1.0, 1000);
        let trajectory = integrator
            .integrate(&Parabola, Point2D::origin())
            .unwrap();
        assert!(matches!(
            trajectory.state_at(1.5),
            Err(PlannerError::ProgressOutOfRange { .. })
        ));
        assert!(trajectory.state_at(-0.1).is_err());
    }

    #[test]
    fn evaluation_budget_is_enforced() {
        let integrator = GillIntegrator::new(0.1, 1.0, 20);
        let err = integrator
            .integrate(&Parabola, Point2D::origin())
            .unwrap_err();
        assert!(matches!(
            err,
            PlannerError::EvaluationBudgetExceeded {
                max_evaluations: 20,
                ..
            }
        ));
    }

    #[test]
    fn non_finite_state_is_an_error() {
        let integrator = GillIntegrator::new(0.1, 1.0, 1000);
        assert!(matches!(
            integrator.integrate(&Explodes, Point2D::origin()),
            Err(PlannerError::NonFiniteState { .. })
        ));
    }
}
