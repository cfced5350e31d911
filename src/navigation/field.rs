//! Field layout
//!
//! The field is a square with a central obstacle (the submersible), a strip
//! down the middle separating the two alliances, and walls along three of
//! the four edges the robot can reach from its own side. Every region is a
//! rectangle inflated by a tolerance so the robot keeps its distance.

use std::fmt;

use crate::common::types::Point2D;
use crate::config::AllianceColor;
use crate::geometry::Rectangle;

/// Side length of the square field
pub const FIELD_SIZE: f64 = 144.0;

/// Half the field, where the alliance strip runs
pub const FIELD_CENTER: f64 = FIELD_SIZE / 2.0;

/// Footprint of the submersible along x
pub const SUBMERSIBLE_LENGTH: f64 = 42.75;

/// Footprint of the submersible along y
pub const SUBMERSIBLE_DEPTH: f64 = 27.5;

/// Kind of fixed field region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// The central obstacle
    Submersible,
    /// The strip dividing the two alliance halves
    AllianceStrip,
    /// The wall behind the alliance's own half
    OuterWall,
    /// The wall along y = 0
    LeftWall,
    /// The wall along y = FIELD_SIZE
    RightWall,
}

impl RegionKind {
    /// Every kind, in layout order
    pub const ALL: [RegionKind; 5] = [
        RegionKind::Submersible,
        RegionKind::AllianceStrip,
        RegionKind::OuterWall,
        RegionKind::LeftWall,
        RegionKind::RightWall,
    ];

    /// Snake-case name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            RegionKind::Submersible => "submersible",
            RegionKind::AllianceStrip => "alliance_strip",
            RegionKind::OuterWall => "outer_wall",
            RegionKind::LeftWall => "left_wall",
            RegionKind::RightWall => "right_wall",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed rectangular region with its inflation already applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRegion {
    pub kind: RegionKind,
    pub center: Point2D,
    /// Extent along x before rotation
    pub width: f64,
    /// Extent along y before rotation
    pub height: f64,
    pub rotation_degrees: f64,
}

impl FieldRegion {
    fn axis_aligned(kind: RegionKind, center: Point2D, width: f64, height: f64) -> Self {
        FieldRegion {
            kind,
            center,
            width,
            height,
            rotation_degrees: 0.0,
        }
    }

    /// The region as a collision rectangle
    pub fn rectangle(&self) -> Rectangle {
        Rectangle::rotated(self.center, self.width, self.height, self.rotation_degrees)
    }
}

/// The five regions a robot on one alliance must avoid
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    alliance: AllianceColor,
    regions: Vec<FieldRegion>,
}

impl FieldLayout {
    /// Build the layout for `alliance`.
    ///
    /// Walls and the alliance strip are `boundary_tolerance` thick around
    /// their center line; the submersible grows by `submersible_tolerance`
    /// on every side.
    pub fn new(
        alliance: AllianceColor,
        boundary_tolerance: f64,
        submersible_tolerance: f64,
    ) -> Self {
        let outer_wall_x = match alliance {
            AllianceColor::Blue => 0.0,
            AllianceColor::Red => FIELD_SIZE,
        };

        let regions = RegionKind::ALL
            .iter()
            .map(|&kind| match kind {
                RegionKind::Submersible => FieldRegion::axis_aligned(
                    kind,
                    Point2D::new(FIELD_CENTER, FIELD_CENTER),
                    SUBMERSIBLE_LENGTH + 2.0 * submersible_tolerance,
                    SUBMERSIBLE_DEPTH + 2.0 * submersible_tolerance,
                ),
                RegionKind::AllianceStrip => FieldRegion::axis_aligned(
                    kind,
                    Point2D::new(FIELD_CENTER, FIELD_CENTER),
                    2.0 * boundary_tolerance,
                    FIELD_SIZE,
                ),
                RegionKind::OuterWall => FieldRegion::axis_aligned(
                    kind,
                    Point2D::new(outer_wall_x, FIELD_CENTER),
                    boundary_tolerance,
                    FIELD_SIZE,
                ),
                RegionKind::LeftWall => FieldRegion::axis_aligned(
                    kind,
                    Point2D::new(FIELD_CENTER, 0.0),
                    FIELD_SIZE,
                    boundary_tolerance,
                ),
                RegionKind::RightWall => FieldRegion::axis_aligned(
                    kind,
                    Point2D::new(FIELD_CENTER, FIELD_SIZE),
                    FIELD_SIZE,
                    boundary_tolerance,
                ),
            })
            .collect();

        FieldLayout { alliance, regions }
    }

    /// Alliance whose half this layout guards
    pub fn alliance(&self) -> AllianceColor {
        self.alliance
    }

    /// All regions, in [`RegionKind::ALL`] order
    pub fn regions(&self) -> &[FieldRegion] {
        &self.regions
    }

    /// Look up a region by kind
    pub fn region(&self, kind: RegionKind) -> Option<&FieldRegion> {
        self.regions.iter().find(|r| r.kind == kind)
    }
}
