//! Constant-heading trajectory planning for a square competition field.
//!
//! Given a start point, an end point and a final heading, the planner finds
//! a cubic curve and a fixed chassis heading that keep the robot clear of
//! the field's fixed regions, then estimates how long the drive and the
//! rotations take.
//!
//! ```no_run
//! use fieldpath_core::SolverConfig;
//!
//! let config = SolverConfig::load("configs/blue_scenario.yaml".as_ref())?;
//! let result = fieldpath_core::solve(&config)?;
//! println!("total time {:.3}", result.total_time());
//! # Ok::<(), fieldpath_core::PlannerError>(())
//! ```
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod geometry;
pub mod navigation;

use rayon::prelude::*;

pub use crate::config::{AllianceColor, IntegratorSettings, OptimizerSettings, SolverConfig};
pub use crate::control::trajectory::export::PathLine;
pub use crate::control::{TrajectoryResult, TrajectorySolver};
pub use crate::error::{PlannerError, Result};
pub use crate::geometry::CubicCurve;

/// Solve a single configuration
pub fn solve(config: &SolverConfig) -> Result<TrajectoryResult> {
    TrajectorySolver::new(config.clone())?.solve()
}

/// Solve several independent configurations in parallel.
///
/// Results are returned in input order.
pub fn solve_all(configs: &[SolverConfig]) -> Vec<Result<TrajectoryResult>> {
    configs.par_iter().map(solve).collect()
}
