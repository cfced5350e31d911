//! Field model for trajectory planning
pub mod collision;
pub mod field;

pub use self::collision::{FieldCollisionModel, RegionPenalty, PENALTY_SAMPLES};
pub use self::field::{FieldLayout, FieldRegion, RegionKind, FIELD_CENTER, FIELD_SIZE};
