//! Field collision scoring
//!
//! Sweeps the robot footprint along a curve and measures how far it
//! penetrates each field region. The score is graded rather than binary so
//! the optimizer can tell a grazing path from one driving through a wall.

use tracing::trace;

use super::field::{FieldLayout, RegionKind};
use crate::config::SolverConfig;
use crate::geometry::{separating_width, CubicCurve, Rectangle};

/// Number of curve samples used for a penalty
pub const PENALTY_SAMPLES: usize = 100;

/// Penalty breakdown for a single region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionPenalty {
    pub kind: RegionKind,
    pub penalty: f64,
}

/// Scores robot paths against a fixed field layout
#[derive(Debug, Clone)]
pub struct FieldCollisionModel {
    layout: FieldLayout,
    // Region rectangles never change, so build them once
    obstacles: Vec<(RegionKind, Rectangle)>,
    robot_width: f64,
    robot_height: f64,
    weight: f64,
}

impl FieldCollisionModel {
    /// Create a new collision model for a robot of the given footprint
    pub fn new(layout: FieldLayout, robot_width: f64, robot_height: f64, weight: f64) -> Self {
        let obstacles = layout
            .regions()
            .iter()
            .map(|region| (region.kind, region.rectangle()))
            .collect();

        FieldCollisionModel {
            layout,
            obstacles,
            robot_width,
            robot_height,
            weight,
        }
    }

    /// Build the model described by a solver configuration
    pub fn from_config(config: &SolverConfig) -> Self {
        let layout = FieldLayout::new(
            config.alliance,
            config.boundary_tolerance,
            config.submersible_tolerance,
        );
        Self::new(layout, config.robot_width, config.robot_height, config.c2)
    }

    /// The field layout this model scores against
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Robot rectangle at curve parameter `t` facing `theta` radians
    pub fn footprint_at(&self, curve: &CubicCurve, theta: f64, t: f64) -> Rectangle {
        Rectangle::rotated(
            curve.position(t),
            self.robot_width,
            self.robot_height,
            theta.to_degrees(),
        )
    }

    /// Evenly spaced sample parameters covering [0, 1] inclusive
    fn sample_parameters() -> impl Iterator<Item = f64> {
        let last = (PENALTY_SAMPLES - 1) as f64;
        (0..PENALTY_SAMPLES).map(move |i| i as f64 / last)
    }

    /// Weighted mean penetration of the swept footprint into all regions.
    ///
    /// Zero exactly when no sampled pose touches any region.
    pub fn penalty(&self, curve: &CubicCurve, theta: f64) -> f64 {
        let total: f64 = Self::sample_parameters()
            .map(|t| {
                let robot = self.footprint_at(curve, theta, t);
                self.obstacles
                    .iter()
                    .map(|(_, obstacle)| separating_width(&robot, obstacle))
                    .sum::<f64>()
            })
            .sum();

        let penalty = self.weight * total / PENALTY_SAMPLES as f64;
        trace!(theta, penalty, "Scored curve");
        penalty
    }

    /// Penalty split by region, in layout order. Sums to [`Self::penalty`].
    pub fn region_penalties(&self, curve: &CubicCurve, theta: f64) -> Vec<RegionPenalty> {
        let mut totals = vec![0.0; self.obstacles.len()];
        for t in Self::sample_parameters() {
            let robot = self.footprint_at(curve, theta, t);
            for (total, (_, obstacle)) in totals.iter_mut().zip(&self.obstacles) {
                *total += separating_width(&robot, obstacle);
            }
        }

        self.obstacles
            .iter()
            .zip(totals)
            .map(|((kind, _), total)| RegionPenalty {
                kind: *kind,
                penalty: self.weight * total / PENALTY_SAMPLES as f64,
            })
            .collect()
    }

    /// Check whether no sampled pose along the curve touches any region
    pub fn is_path_clear(&self, curve: &CubicCurve, theta: f64) -> bool {
        Self::sample_parameters().all(|t| {
            let robot = self.footprint_at(curve, theta, t);
            self.obstacles
                .iter()
                .all(|(_, obstacle)| separating_width(&robot, obstacle) == 0.0)
        })
    }
}
