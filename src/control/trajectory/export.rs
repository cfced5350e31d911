//! Path line export
//!
//! Solved segments are handed to the path editor as a "line": the end
//! point tagged with a constant heading, plus the two inner control points.

use serde::{Deserialize, Serialize};

use crate::common::types::Point2D;
use crate::geometry::CubicCurve;

/// How the robot heading behaves along a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingMode {
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point2D> for ControlPoint {
    fn from(point: Point2D) -> Self {
        ControlPoint {
            x: point.x,
            y: point.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndPoint {
    pub x: f64,
    pub y: f64,
    pub heading: HeadingMode,
    /// Heading held along the line, in degrees
    pub degrees: f64,
}

/// One exported path segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathLine {
    pub end_point: EndPoint,
    pub control_points: [ControlPoint; 2],
    pub color: String,
}

impl PathLine {
    /// Build a line ending at the curve's end point, held at `degrees`
    pub fn from_curve(curve: &CubicCurve, degrees: f64, color: &str) -> Self {
        let [_, p1, p2, p3] = curve.control_points();
        PathLine {
            end_point: EndPoint {
                x: p3.x,
                y: p3.y,
                heading: HeadingMode::Constant,
                degrees,
            },
            control_points: [p1.into(), p2.into()],
            color: color.to_string(),
        }
    }

    /// Pretty-printed JSON as the path editor reads it
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
