//! Constant-heading trajectory solving
//!
//! [`TrajectorySolver`] searches over the travel heading and the two free
//! control points of a cubic curve for the path whose swept footprint
//! penetrates the field regions least. It then simulates the robot along
//! the winning curve and derives two timing estimates: `t1` for covering
//! the path and `t2` for the rotations before and after it.

pub mod export;

use std::f64::consts::TAU;

use tracing::{debug, info, instrument, warn};

use self::export::PathLine;
use super::integrator::{GillIntegrator, TrajectorySample};
use super::motion::{ConstantHeadingModel, DriveParameters};
use super::optimizer::BoundedNelderMead;
use crate::common::types::Point2D;
use crate::common::wrap_to_tau;
use crate::config::{AllianceColor, SolverConfig};
use crate::error::{PlannerError, Result};
use crate::geometry::CubicCurve;
use crate::navigation::{FieldCollisionModel, FIELD_CENTER, FIELD_SIZE};

/// Number of variables searched by the optimizer
pub const SEARCH_DIMENSION: usize = 5;

/// The values the optimizer controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParameters {
    /// Constant travel heading in radians
    pub theta: f64,
    pub p1: Point2D,
    pub p2: Point2D,
}

impl SearchParameters {
    /// Flatten to `[theta, p1.x, p1.y, p2.x, p2.y]`
    pub fn to_array(&self) -> [f64; SEARCH_DIMENSION] {
        [self.theta, self.p1.x, self.p1.y, self.p2.x, self.p2.y]
    }

    /// Inverse of [`SearchParameters::to_array`]
    pub fn from_array(x: &[f64; SEARCH_DIMENSION]) -> Self {
        SearchParameters {
            theta: x[0],
            p1: Point2D::new(x[1], x[2]),
            p2: Point2D::new(x[3], x[4]),
        }
    }
}

/// Box bounds on [`SearchParameters`], in the same flattened order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBounds {
    pub lower: [f64; SEARCH_DIMENSION],
    pub upper: [f64; SEARCH_DIMENSION],
}

impl SearchBounds {
    /// Bounds for a configuration.
    ///
    /// Control points stay on the robot's own half of the field, inset by
    /// the boundary tolerance plus the smaller footprint side.
    pub fn from_config(config: &SolverConfig) -> Result<Self> {
        let margin = config.boundary_tolerance + config.min_footprint();

        let (x_min, x_max) = match config.alliance {
            AllianceColor::Blue => (margin, FIELD_CENTER - margin),
            AllianceColor::Red => (FIELD_CENTER + margin, FIELD_SIZE - margin),
        };
        let (y_min, y_max) = (margin, FIELD_SIZE - margin);

        if x_min > x_max {
            return Err(PlannerError::FootprintTooLarge {
                axis: "x",
                lower: x_min,
                upper: x_max,
            });
        }
        if y_min > y_max {
            return Err(PlannerError::FootprintTooLarge {
                axis: "y",
                lower: y_min,
                upper: y_max,
            });
        }

        Ok(SearchBounds {
            lower: [0.0, x_min, y_min, x_min, y_min],
            upper: [TAU, x_max, y_max, x_max, y_max],
        })
    }

    /// Project parameters into the box
    pub fn clamp(&self, parameters: &SearchParameters) -> SearchParameters {
        let x = parameters.to_array();
        SearchParameters::from_array(&std::array::from_fn(|i| {
            x[i].clamp(self.lower[i], self.upper[i])
        }))
    }

    /// Whether every parameter lies within its bounds
    pub fn contains(&self, parameters: &SearchParameters) -> bool {
        parameters
            .to_array()
            .iter()
            .enumerate()
            .all(|(i, v)| *v >= self.lower[i] && *v <= self.upper[i])
    }
}

/// Result of the parameter search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub parameters: SearchParameters,
    pub penalty: f64,
    /// Whether the search beat the initial guess
    pub improved: bool,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Motion simulated along a fixed curve
#[derive(Debug, Clone)]
pub struct Simulation {
    pub samples: Vec<TrajectorySample>,
    pub derivative_evaluations: usize,
    pub inversion_fallbacks: usize,
    pub off_segment_lookups: usize,
}

/// A solved trajectory segment
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryResult {
    /// Constant travel heading in radians, within [0, 2π]
    pub theta: f64,
    pub curve: CubicCurve,
    /// Path traversal time estimate
    pub t1: f64,
    /// Rotation time estimate
    pub t2: f64,
    /// Collision penalty of the chosen curve; zero means no contact
    pub penalty: f64,
    pub improved: bool,
    /// Motion-model steps on the segment whose curve lookup fell back to an
    /// approximate parameter
    pub inversion_fallbacks: usize,
    /// Lookups after the robot ran past the end point, where no exact
    /// parameter exists
    pub off_segment_lookups: usize,
    pub derivative_evaluations: usize,
}

impl TrajectoryResult {
    /// Sum of the traversal and rotation estimates
    pub fn total_time(&self) -> f64 {
        self.t1 + self.t2
    }

    /// True when the simulation relied on approximate curve lookups while
    /// still on the segment
    pub fn is_degraded(&self) -> bool {
        self.inversion_fallbacks > 0
    }

    /// True when the chosen curve touches no field region
    pub fn is_collision_free(&self) -> bool {
        self.penalty == 0.0
    }

    /// Export as a constant-heading path line for the path editor
    pub fn export_line(&self, color: &str) -> PathLine {
        PathLine::from_curve(&self.curve, self.theta.to_degrees(), color)
    }
}

/// Solves one configuration. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct TrajectorySolver {
    config: SolverConfig,
    bounds: SearchBounds,
    collision: FieldCollisionModel,
}

impl TrajectorySolver {
    /// Create a new solver, rejecting invalid configurations up front
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let bounds = SearchBounds::from_config(&config)?;
        let collision = FieldCollisionModel::from_config(&config);

        Ok(TrajectorySolver {
            config,
            bounds,
            collision,
        })
    }

    /// The validated configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Box constraints of the search
    pub fn bounds(&self) -> &SearchBounds {
        &self.bounds
    }

    /// Collision model built for the configured alliance
    pub fn collision_model(&self) -> &FieldCollisionModel {
        &self.collision
    }

    /// Starting point for the search: face the final heading, with both
    /// control points on the start column, then projected into bounds
    pub fn initial_guess(&self) -> SearchParameters {
        let p0 = self.config.p0;
        let p3 = self.config.p3;
        let guess = SearchParameters {
            theta: wrap_to_tau(self.config.theta_final),
            p1: Point2D::new(p0.x, (p0.y + p3.y) / 2.0),
            p2: Point2D::new(p0.x, p3.y),
        };
        self.bounds.clamp(&guess)
    }

    /// Curve through the fixed endpoints shaped by `parameters`
    pub fn curve_for(&self, parameters: &SearchParameters) -> CubicCurve {
        CubicCurve::new(self.config.p0, parameters.p1, parameters.p2, self.config.p3)
    }

    /// Collision penalty of a candidate
    pub fn penalty(&self, parameters: &SearchParameters) -> f64 {
        let curve = self.curve_for(parameters);
        self.collision.penalty(&curve, parameters.theta)
    }

    /// Minimize the collision penalty over the search box.
    ///
    /// Always returns a feasible candidate. A non-zero penalty means no
    /// collision-free path was found.
    #[instrument(skip(self), fields(alliance = ?self.config.alliance))]
    pub fn optimize(&self) -> SearchOutcome {
        let optimizer =
            BoundedNelderMead::new(self.bounds.lower, self.bounds.upper, self.config.optimizer);
        let objective =
            |x: &[f64; SEARCH_DIMENSION]| self.penalty(&SearchParameters::from_array(x));

        let outcome = optimizer.minimize(&objective, &self.initial_guess().to_array());

        let result = SearchOutcome {
            parameters: SearchParameters::from_array(&outcome.point),
            penalty: outcome.value,
            improved: outcome.improved(),
            iterations: outcome.iterations,
            evaluations: outcome.evaluations,
        };
        debug!(
            penalty = result.penalty,
            initial_penalty = outcome.initial_value,
            iterations = result.iterations,
            "Optimized search parameters"
        );
        result
    }

    /// Simulate the robot driving `curve` at constant heading `theta`.
    ///
    /// Every call owns its own integrator and motion model.
    pub fn simulate(&self, curve: &CubicCurve, theta: f64) -> Result<Simulation> {
        let model = ConstantHeadingModel::new(curve, theta, DriveParameters::from(&self.config));
        let integrator = GillIntegrator::from_settings(&self.config.integrator);

        let trajectory = integrator.integrate(&model, curve.start())?;
        let samples = trajectory.sample(self.config.integrator.output_samples)?;

        Ok(Simulation {
            samples,
            derivative_evaluations: trajectory.evaluations(),
            inversion_fallbacks: model.inversion_fallbacks(),
            off_segment_lookups: model.off_segment_lookups(),
        })
    }

    /// Progress at the sample whose distance from the field origin is
    /// closest to `target_arc_length`, rescaled to the integration span
    pub fn find_t1(&self, samples: &[TrajectorySample], target_arc_length: f64) -> f64 {
        if samples.len() < 2 {
            return 0.0;
        }

        let index = samples
            .iter()
            .map(|s| (s.position.coords.norm() - target_arc_length).abs())
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(i, _)| i);
        index as f64 * self.config.integrator.span / (samples.len() - 1) as f64
    }

    /// Time to turn from the initial heading to `theta` and then on to the
    /// final heading
    pub fn find_t2(&self, theta: f64) -> f64 {
        ((self.config.theta_final - theta).abs() + (self.config.theta_initial - theta).abs())
            / self.config.angular_velocity
    }

    /// Run the full pipeline: search, simulate, then estimate timing
    #[instrument(skip(self), fields(alliance = ?self.config.alliance))]
    pub fn solve(&self) -> Result<TrajectoryResult> {
        info!(
            start = ?(self.config.p0.x, self.config.p0.y),
            end = ?(self.config.p3.x, self.config.p3.y),
            "Solving trajectory"
        );

        let search = self.optimize();
        if search.penalty > 0.0 {
            warn!(
                penalty = search.penalty,
                "No collision-free path found, using least-penalized candidate"
            );
        }

        let theta = search.parameters.theta;
        let curve = self.curve_for(&search.parameters);
        let simulation = self.simulate(&curve, theta)?;
        if simulation.inversion_fallbacks > 0 {
            warn!(
                fallbacks = simulation.inversion_fallbacks,
                "Curve inversion fell back during simulation"
            );
        }
        debug!(
            off_segment_lookups = simulation.off_segment_lookups,
            "Lookups past the end point"
        );

        let t1 = self.find_t1(&simulation.samples, curve.arc_length());
        let t2 = self.find_t2(theta);

        let result = TrajectoryResult {
            theta,
            curve,
            t1,
            t2,
            penalty: search.penalty,
            improved: search.improved,
            inversion_fallbacks: simulation.inversion_fallbacks,
            off_segment_lookups: simulation.off_segment_lookups,
            derivative_evaluations: simulation.derivative_evaluations,
        };
        info!(
            theta = result.theta,
            t1 = result.t1,
            t2 = result.t2,
            total = result.total_time(),
            "Trajectory solved"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::blue_config;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn solver() -> TrajectorySolver {
        TrajectorySolver::new(blue_config()).unwrap()
    }

    #[test]
    fn blue_bounds_stay_on_blue_half() {
        let bounds = SearchBounds::from_config(&blue_config()).unwrap();
        let margin = 3.0 + 12.83;
        assert_eq!(bounds.lower[0], 0.0);
        assert_eq!(bounds.upper[0], TAU);
        assert_relative_eq!(bounds.lower[1], margin);
        assert_relative_eq!(bounds.upper[1], FIELD_CENTER - margin);
        assert_relative_eq!(bounds.upper[4], FIELD_SIZE - margin);
    }

    #[test]
    fn red_bounds_stay_on_red_half() {
        let mut config = blue_config();
        config.alliance = AllianceColor::Red;
        let bounds = SearchBounds::from_config(&config).unwrap();
        assert!(bounds.lower[1] > FIELD_CENTER);
        assert!(bounds.upper[3] < FIELD_SIZE);
    }

    #[test]
    fn initial_guess_is_feasible() {
        let solver = solver();
        let guess = solver.initial_guess();
        assert!(solver.bounds().contains(&guess));
        assert_relative_eq!(guess.theta, FRAC_PI_2);
        assert_relative_eq!(guess.p1.y, 57.5);
        assert_relative_eq!(guess.p2.y, 110.0);
        // p0.x = 10 sits inside the margin and gets pushed out
        assert_relative_eq!(guess.p1.x, 3.0 + 12.83);
    }

    #[test]
    fn parameters_flatten_in_order() {
        let parameters = SearchParameters {
            theta: 1.0,
            p1: Point2D::new(2.0, 3.0),
            p2: Point2D::new(4.0, 5.0),
        };
        assert_eq!(parameters.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(SearchParameters::from_array(&parameters.to_array()), parameters);
    }

    #[test]
    fn t2_sums_both_rotations() {
        let solver = solver();
        assert_relative_eq!(solver.find_t2(FRAC_PI_2), FRAC_PI_2 / 6.0);
        assert_relative_eq!(solver.find_t2(PI), (FRAC_PI_2 + PI) / 6.0);
    }

    #[test]
    fn t1_picks_sample_closest_to_arc_length() {
        let solver = solver();
        let samples: Vec<TrajectorySample> = (0..5)
            .map(|i| TrajectorySample {
                progress: i as f64,
                position: Point2D::new(0.0, 10.0 * i as f64),
            })
            .collect();
        // Span 30 over 4 intervals: index 3 maps to 22.5
        assert_relative_eq!(solver.find_t1(&samples, 29.0), 22.5);
        assert_eq!(solver.find_t1(&[], 10.0), 0.0);
    }

    #[test]
    fn optimize_never_worsens_initial_guess() {
        let solver = solver();
        let initial = solver.penalty(&solver.initial_guess());
        let outcome = solver.optimize();
        assert!(outcome.penalty <= initial);
        assert!(solver.bounds().contains(&outcome.parameters));
    }

    #[test]
    fn simulation_starts_at_p0() {
        let solver = solver();
        let guess = solver.initial_guess();
        let curve = solver.curve_for(&guess);
        let simulation = solver.simulate(&curve, guess.theta).unwrap();
        assert_eq!(simulation.samples.len(), 1000);
        assert_eq!(simulation.samples[0].position, Point2D::new(10.0, 5.0));
        assert_eq!(simulation.samples[999].progress, 30.0);
    }

    #[test]
    fn running_past_the_end_point_is_not_degraded() {
        let solver = solver();
        let curve = CubicCurve::new(
            Point2D::new(10.0, 5.0),
            Point2D::new(10.0, 40.0),
            Point2D::new(10.0, 75.0),
            Point2D::new(10.0, 110.0),
        );
        let simulation = solver.simulate(&curve, FRAC_PI_2).unwrap();
        assert_eq!(simulation.inversion_fallbacks, 0);
        // The full span carries the robot well beyond y = 110
        assert!(simulation.samples[999].position.y > 110.0);
        assert!(simulation.off_segment_lookups > 0);

        let result = TrajectoryResult {
            theta: FRAC_PI_2,
            curve,
            t1: 1.0,
            t2: 0.0,
            penalty: 0.0,
            improved: false,
            inversion_fallbacks: simulation.inversion_fallbacks,
            off_segment_lookups: simulation.off_segment_lookups,
            derivative_evaluations: simulation.derivative_evaluations,
        };
        assert!(!result.is_degraded());
    }

    #[test]
    fn oversized_robot_is_rejected() {
        let mut config = blue_config();
        config.robot_height = 80.0;
        config.robot_width = 80.0;
        let err = TrajectorySolver::new(config).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
