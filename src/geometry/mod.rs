//! Geometry primitives used by the planner
//!
//! - [`curve`]: cubic Bézier path segments (position, tangent, arc length, inversion)
//! - [`rectangle`]: rotated rectangles and the separating-axis overlap measure
//! - [`roots`]: real roots of cubic polynomials
pub mod curve;
pub mod rectangle;
pub mod roots;

pub use self::curve::{CubicCurve, Inversion, InversionQuality, ROOT_MATCH_TOLERANCE};
pub use self::rectangle::{rotated_rectangle, separating_width, Rectangle};
