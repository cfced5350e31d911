//! Motion simulation and trajectory search
pub mod integrator;
pub mod motion;
pub mod optimizer;
pub mod trajectory;

pub use self::integrator::{DenseTrajectory, GillIntegrator, TrajectorySample};
pub use self::motion::{ConstantHeadingModel, DifferentialEquation, DriveParameters};
pub use self::optimizer::{BoundedNelderMead, Objective, OptimizationOutcome};
pub use self::trajectory::{
    SearchBounds, SearchOutcome, SearchParameters, Simulation, TrajectoryResult, TrajectorySolver,
};
