//! Constant-heading motion model
//!
//! The robot keeps its chassis pointed at a fixed heading while it follows
//! a curve. Its progress along the curve is throttled by the commanded
//! speed projected onto the path, minus friction and a drag term that grows
//! with the mismatch between heading and path direction.

use std::cell::Cell;

use crate::common::types::{Point2D, Vector2D};
use crate::config::SolverConfig;
use crate::geometry::{CubicCurve, InversionQuality};

/// Tangents shorter than this (squared) are treated as a stall
const MIN_TANGENT_NORM_SQUARED: f64 = 1e-12;

/// Parameters this close to 1 count as having reached the end point
const END_PARAMETER_TOLERANCE: f64 = 1e-3;

/// A first-order system `dy/ds = f(s, y)` over planar positions
pub trait DifferentialEquation {
    /// Rate of change of the position at `progress`
    fn derivative(&self, progress: f64, state: &Point2D) -> Vector2D;
}

/// Physical parameters of the drive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveParameters {
    pub v_max: f64,
    pub mass: f64,
    pub mu_k: f64,
    pub c1: f64,
}

impl From<&SolverConfig> for DriveParameters {
    fn from(config: &SolverConfig) -> Self {
        DriveParameters {
            v_max: config.v_max,
            mass: config.mass,
            mu_k: config.mu_k,
            c1: config.c1,
        }
    }
}

/// Motion along a curve at a constant commanded heading.
///
/// Each model is tied to one curve and one solve. Curve lookups that fall
/// back are counted separately depending on whether the robot is still on
/// the segment or has already run past its end point.
#[derive(Debug)]
pub struct ConstantHeadingModel<'a> {
    curve: &'a CubicCurve,
    theta: f64,
    drive: DriveParameters,
    inversion_fallbacks: Cell<usize>,
    off_segment_lookups: Cell<usize>,
    // Furthest matched or nearest-root parameter seen so far
    furthest_parameter: Cell<f64>,
    left_segment: Cell<bool>,
}

impl<'a> ConstantHeadingModel<'a> {
    /// Create a new model for driving `curve` at heading `theta`
    pub fn new(curve: &'a CubicCurve, theta: f64, drive: DriveParameters) -> Self {
        ConstantHeadingModel {
            curve,
            theta,
            drive,
            inversion_fallbacks: Cell::new(0),
            off_segment_lookups: Cell::new(0),
            furthest_parameter: Cell::new(0.0),
            left_segment: Cell::new(false),
        }
    }

    /// Commanded heading in radians
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Fallback lookups made while the robot was still on the segment
    pub fn inversion_fallbacks(&self) -> usize {
        self.inversion_fallbacks.get()
    }

    /// Fallback lookups made after the robot ran past the end point
    pub fn off_segment_lookups(&self) -> usize {
        self.off_segment_lookups.get()
    }

    /// Whether the robot has reached or passed the end of the segment
    pub fn has_left_segment(&self) -> bool {
        self.left_segment.get()
    }

    fn record_lookup(&self, parameter: f64, quality: InversionQuality) {
        if quality == InversionQuality::Default {
            // No root on the segment; past the end if we were already beyond halfway
            if self.furthest_parameter.get() >= 0.5 {
                self.left_segment.set(true);
            }
        } else {
            let furthest = self.furthest_parameter.get().max(parameter);
            self.furthest_parameter.set(furthest);
            if furthest >= 1.0 - END_PARAMETER_TOLERANCE {
                self.left_segment.set(true);
            }
        }

        if quality == InversionQuality::Matched {
            return;
        }
        let counter = if self.left_segment.get() {
            &self.off_segment_lookups
        } else {
            &self.inversion_fallbacks
        };
        counter.set(counter.get() + 1);
    }

    /// Scalar multiplier applied to the tangent at a point of the curve
    pub fn speed(&self, tangent: &Vector2D) -> f64 {
        let norm_squared = tangent.norm_squared();
        if norm_squared < MIN_TANGENT_NORM_SQUARED {
            return 0.0;
        }
        let norm = norm_squared.sqrt();

        let heading = Vector2D::new(self.theta.cos(), self.theta.sin());
        let path_direction = tangent.y.atan2(tangent.x);
        let mismatch = (self.theta - path_direction).sin().abs();

        let drive = tangent.dot(&heading) * self.drive.v_max;
        let resistance = norm * (self.drive.mu_k * self.drive.mass + self.drive.c1 * mismatch);

        (drive - resistance) / norm_squared
    }
}

impl DifferentialEquation for ConstantHeadingModel<'_> {
    fn derivative(&self, _progress: f64, state: &Point2D) -> Vector2D {
        let inversion = self.curve.invert(state);
        self.record_lookup(inversion.parameter, inversion.quality);

        let tangent = self.curve.tangent(inversion.parameter);
        tangent * self.speed(&tangent)
    }
}
