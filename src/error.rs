//! Error types for trajectory planning.

use thiserror::Error;

/// Errors that can occur while configuring or solving a trajectory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The robot footprint plus tolerance leaves no room for control points.
    #[error("footprint does not fit the field along {axis}: lower bound {lower} exceeds upper bound {upper}")]
    FootprintTooLarge {
        /// Axis name ("x" or "y").
        axis: &'static str,
        /// Computed lower search bound.
        lower: f64,
        /// Computed upper search bound.
        upper: f64,
    },

    /// The integrator ran out of derivative evaluations.
    #[error("integration exceeded {max_evaluations} derivative evaluations at progress {progress}")]
    EvaluationBudgetExceeded {
        /// Configured evaluation cap.
        max_evaluations: usize,
        /// Progress value reached when the cap was hit.
        progress: f64,
    },

    /// The integrated state stopped being finite.
    #[error("integration produced a non-finite state at progress {progress}")]
    NonFiniteState {
        /// Progress value of the offending step.
        progress: f64,
    },

    /// A dense-output query fell outside the integrated span.
    #[error("progress {progress} is outside the integrated span [{start}, {end}]")]
    ProgressOutOfRange {
        /// Requested progress.
        progress: f64,
        /// Start of the integrated span.
        start: f64,
        /// End of the integrated span.
        end: f64,
    },

    /// Reading or parsing a configuration source failed.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(String),
}

impl PlannerError {
    /// Create an invalid configuration error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Check whether this error was raised before any solving started.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::FootprintTooLarge { .. } | Self::ConfigLoad(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_field_and_reason() {
        let err = PlannerError::invalid_config("v_max", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration: v_max must be positive"
        );
        assert!(err.is_configuration_error());
    }

    #[test]
    fn budget_error_is_not_a_configuration_error() {
        let err = PlannerError::EvaluationBudgetExceeded {
            max_evaluations: 10,
            progress: 0.5,
        };
        assert!(err.to_string().contains("10"));
        assert!(!err.is_configuration_error());
    }
}
