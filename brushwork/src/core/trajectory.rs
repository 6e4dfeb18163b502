//! Waypoint trajectories produced by the motion planner.

use serde::{Deserialize, Serialize};

use crate::core::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryKind {
    /// Straight interpolated line to the target center.
    Direct,
    /// Routed around the listed avoid zones.
    Safe,
    /// Lawnmower sweep across a region.
    Exploratory,
}

/// An ordered list of waypoints the brush follows.
///
/// After interpolation a trajectory has at least two points unless the
/// request was degenerate (e.g. an empty sweep region).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub kind: TrajectoryKind,
    pub points: Vec<Point>,
    #[serde(default)]
    pub target_zone_id: String,
    /// Populated for `safe` trajectories only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid_zone_ids: Vec<String>,
}

impl Trajectory {
    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
