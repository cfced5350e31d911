//! Solver configuration
//!
//! A [`SolverConfig`] describes one field/robot setup. The physical fields
//! are all required; the `integrator` and `optimizer` sections are tuning
//! knobs with defaults. Configurations load from YAML and are validated
//! before any solving starts.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::types::Point2D;
use crate::control::trajectory::SearchBounds;
use crate::error::{PlannerError, Result};

/// Which side of the field the robot starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllianceColor {
    Blue,
    Red,
}

/// Fixed-step integration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    /// Progress advanced per integration step
    pub step: f64,
    /// Total progress span integrated, starting at 0
    pub span: f64,
    /// Hard cap on derivative evaluations
    pub max_evaluations: usize,
    /// Number of evenly spaced samples taken from the dense output
    pub output_samples: usize,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        IntegratorSettings {
            step: 0.005,
            span: 30.0,
            max_evaluations: 30_000,
            output_samples: 1000,
        }
    }
}

impl IntegratorSettings {
    /// Configure the integrator with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&step) = params.get("step") {
            if !(step > 0.0) {
                return Err(PlannerError::invalid_config("step", "must be positive"));
            }
            self.step = step;
        }

        if let Some(&span) = params.get("span") {
            if !(span > 0.0) {
                return Err(PlannerError::invalid_config("span", "must be positive"));
            }
            self.span = span;
        }

        if let Some(&max_evaluations) = params.get("max_evaluations") {
            if !(max_evaluations >= 1.0) {
                return Err(PlannerError::invalid_config(
                    "max_evaluations",
                    "must be at least 1",
                ));
            }
            self.max_evaluations = max_evaluations as usize;
        }

        if let Some(&output_samples) = params.get("output_samples") {
            if !(output_samples >= 2.0) {
                return Err(PlannerError::invalid_config(
                    "output_samples",
                    "must be at least 2",
                ));
            }
            self.output_samples = output_samples as usize;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(PlannerError::invalid_config("step", "must be positive"));
        }
        if !(self.span > 0.0 && self.span.is_finite()) {
            return Err(PlannerError::invalid_config("span", "must be positive"));
        }
        if self.max_evaluations == 0 {
            return Err(PlannerError::invalid_config(
                "max_evaluations",
                "must be at least 1",
            ));
        }
        if self.output_samples < 2 {
            return Err(PlannerError::invalid_config(
                "output_samples",
                "must be at least 2",
            ));
        }
        Ok(())
    }
}

/// Derivative-free optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Iteration cap for the simplex search
    pub max_iterations: usize,
    /// Initial simplex edge as a fraction of each bound range
    pub initial_step_fraction: f64,
    /// Stop once the simplex values differ by less than this
    pub value_tolerance: f64,
    /// ...and the simplex vertices lie this close together
    pub parameter_tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            max_iterations: 600,
            initial_step_fraction: 0.1,
            value_tolerance: 1e-10,
            parameter_tolerance: 1e-7,
        }
    }
}

impl OptimizerSettings {
    /// Configure the optimizer with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&max_iterations) = params.get("max_iterations") {
            if !(max_iterations >= 1.0) {
                return Err(PlannerError::invalid_config(
                    "max_iterations",
                    "must be at least 1",
                ));
            }
            self.max_iterations = max_iterations as usize;
        }

        if let Some(&fraction) = params.get("initial_step_fraction") {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(PlannerError::invalid_config(
                    "initial_step_fraction",
                    "must be in (0, 1]",
                ));
            }
            self.initial_step_fraction = fraction;
        }

        if let Some(&tolerance) = params.get("value_tolerance") {
            if !(tolerance >= 0.0) {
                return Err(PlannerError::invalid_config(
                    "value_tolerance",
                    "must be non-negative",
                ));
            }
            self.value_tolerance = tolerance;
        }

        if let Some(&tolerance) = params.get("parameter_tolerance") {
            if !(tolerance >= 0.0) {
                return Err(PlannerError::invalid_config(
                    "parameter_tolerance",
                    "must be non-negative",
                ));
            }
            self.parameter_tolerance = tolerance;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(PlannerError::invalid_config(
                "max_iterations",
                "must be at least 1",
            ));
        }
        if !(self.initial_step_fraction > 0.0 && self.initial_step_fraction <= 1.0) {
            return Err(PlannerError::invalid_config(
                "initial_step_fraction",
                "must be in (0, 1]",
            ));
        }
        if !(self.value_tolerance >= 0.0 && self.parameter_tolerance >= 0.0) {
            return Err(PlannerError::invalid_config(
                "tolerance",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Everything needed to solve one trajectory segment.
///
/// Angles are in radians, distances in field units (inches), `v_max` in
/// field units per second and `mass` in kilograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Maximum drive speed
    pub v_max: f64,
    /// Robot mass
    pub mass: f64,
    /// Kinetic friction coefficient
    pub mu_k: f64,
    /// Heading-mismatch drag coefficient
    pub c1: f64,
    /// Collision penalty weight
    pub c2: f64,
    /// Fixed start point
    pub p0: Point2D,
    /// Fixed end point
    pub p3: Point2D,
    /// Heading the robot must face at the end
    pub theta_final: f64,
    /// Inflation applied to the field walls and alliance strip
    pub boundary_tolerance: f64,
    /// Inflation applied to the central obstacle
    pub submersible_tolerance: f64,
    /// Alliance side
    pub alliance: AllianceColor,
    /// Heading the robot starts with
    pub theta_initial: f64,
    /// Turn rate used for rotation time estimates
    pub angular_velocity: f64,
    /// Robot footprint along its local x axis
    pub robot_width: f64,
    /// Robot footprint along its local y axis
    pub robot_height: f64,
    #[serde(default)]
    pub integrator: IntegratorSettings,
    #[serde(default)]
    pub optimizer: OptimizerSettings,
}

impl SolverConfig {
    /// Load a configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlannerError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&contents)
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| PlannerError::ConfigLoad(e.to_string()))
    }

    /// Serialize the configuration back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| PlannerError::ConfigLoad(e.to_string()))
    }

    /// Apply tuning overrides to the integrator and optimizer sections.
    ///
    /// Keys not recognised by either section are ignored.
    pub fn apply_overrides(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        self.integrator.configure(params)?;
        self.optimizer.configure(params)?;
        Ok(())
    }

    /// Smaller side of the robot footprint
    pub fn min_footprint(&self) -> f64 {
        self.robot_width.min(self.robot_height)
    }

    /// Reject configurations that cannot be solved.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("v_max", self.v_max),
            ("mass", self.mass),
            ("mu_k", self.mu_k),
            ("c1", self.c1),
            ("c2", self.c2),
            ("p0.x", self.p0.x),
            ("p0.y", self.p0.y),
            ("p3.x", self.p3.x),
            ("p3.y", self.p3.y),
            ("theta_final", self.theta_final),
            ("boundary_tolerance", self.boundary_tolerance),
            ("submersible_tolerance", self.submersible_tolerance),
            ("theta_initial", self.theta_initial),
            ("angular_velocity", self.angular_velocity),
            ("robot_width", self.robot_width),
            ("robot_height", self.robot_height),
        ];
        if let Some((field, _)) = finite.iter().find(|(_, value)| !value.is_finite()) {
            return Err(PlannerError::invalid_config(*field, "must be finite"));
        }

        let positive = [
            ("v_max", self.v_max),
            ("angular_velocity", self.angular_velocity),
            ("robot_width", self.robot_width),
            ("robot_height", self.robot_height),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value <= 0.0) {
            return Err(PlannerError::invalid_config(*field, "must be positive"));
        }

        let non_negative = [
            ("mass", self.mass),
            ("mu_k", self.mu_k),
            ("c1", self.c1),
            ("c2", self.c2),
            ("boundary_tolerance", self.boundary_tolerance),
            ("submersible_tolerance", self.submersible_tolerance),
        ];
        if let Some((field, _)) = non_negative.iter().find(|(_, value)| *value < 0.0) {
            return Err(PlannerError::invalid_config(*field, "must be non-negative"));
        }

        self.integrator.validate()?;
        self.optimizer.validate()?;

        // Footprint must leave room for the control points
        SearchBounds::from_config(self).map(|_| ())
    }
}
