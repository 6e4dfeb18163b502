//! Trajectory planning against the live zone registry.
//!
//! The planner resolves zone ids to rectangles and delegates the geometry to
//! [`crate::core::route`]. It never moves anything; walking the produced
//! trajectory is the [`BrushController`](crate::brush::BrushController)'s job.

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::warn;

use crate::core::geometry::{Point, Rect};
use crate::core::route::{
    MAX_WAYPOINTS, downsample, interpolate_line, polyline_length, route_around, step_count,
    sweep_rows,
};
use crate::core::trajectory::{Trajectory, TrajectoryKind};
use crate::registry::ZoneRegistry;

#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Cursor speed in pixels per second.
    pub speed: f64,
    /// Row spacing for exploratory sweeps, in pixels.
    pub scan_spacing: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 1500.0,
            scan_spacing: 50,
        }
    }
}

pub struct MotionPlanner {
    registry: Arc<ZoneRegistry>,
    config: MotionConfig,
}

impl MotionPlanner {
    pub fn new(registry: Arc<ZoneRegistry>, config: MotionConfig) -> Self {
        Self { registry, config }
    }

    /// Straight interpolated line from `start` to the target zone's center.
    pub fn plan_direct(&self, start: Point, zone_id: &str) -> Result<Trajectory> {
        let Some(zone) = self.registry.get(zone_id) else {
            bail!("zone not found: {zone_id}");
        };
        let end = zone.bounds.center();
        let steps = step_count(start.distance_to(end), self.config.speed);
        Ok(Trajectory {
            kind: TrajectoryKind::Direct,
            points: interpolate_line(start, end, steps),
            target_zone_id: zone_id.to_string(),
            avoid_zone_ids: Vec::new(),
        })
    }

    /// Route to the target zone's center, detouring around every zone in
    /// `avoid`. When the router gives up the trajectory is still returned,
    /// with a warning; crossing an obstacle beats never arriving.
    pub fn plan_safe(&self, start: Point, zone_id: &str, avoid: &[String]) -> Result<Trajectory> {
        let Some(zone) = self.registry.get(zone_id) else {
            bail!("zone not found: {zone_id}");
        };
        let mut obstacles = Vec::with_capacity(avoid.len());
        for avoid_id in avoid {
            let Some(avoid_zone) = self.registry.get(avoid_id) else {
                bail!("avoid zone not found: {avoid_id}");
            };
            obstacles.push(avoid_zone.bounds);
        }

        let end = zone.bounds.center();
        let detour = route_around(start, end, &obstacles);
        if !detour.cleared {
            warn!(zone_id, "obstacle routing gave up at max depth, path may cross an avoid zone");
        }

        let points = downsample(self.interpolate_path(&detour.points), MAX_WAYPOINTS);
        Ok(Trajectory {
            kind: TrajectoryKind::Safe,
            points,
            target_zone_id: zone_id.to_string(),
            avoid_zone_ids: avoid.to_vec(),
        })
    }

    /// Lawnmower sweep over `region`, led in from `start`.
    ///
    /// There is no target zone yet; the caller fills `target_zone_id` in once
    /// it knows what the sweep was looking for. A degenerate region produces a
    /// single-point trajectory that parks the cursor where it already is.
    pub fn plan_exploratory(&self, start: Point, region: Rect) -> Trajectory {
        let rows = sweep_rows(&region, self.config.scan_spacing);
        let points = if rows.is_empty() {
            vec![start]
        } else {
            let mut anchors = Vec::with_capacity(rows.len() + 1);
            anchors.push(start);
            anchors.extend(rows);
            downsample(self.interpolate_path(&anchors), MAX_WAYPOINTS)
        };
        Trajectory {
            kind: TrajectoryKind::Exploratory,
            points,
            target_zone_id: String::new(),
            avoid_zone_ids: Vec::new(),
        }
    }

    /// Wall-clock estimate for walking a trajectory at the configured speed.
    pub fn estimate_duration_ms(&self, trajectory: &Trajectory) -> f64 {
        if trajectory.points.len() < 2 || self.config.speed <= 0.0 {
            return 0.0;
        }
        polyline_length(&trajectory.points) / self.config.speed * 1000.0
    }

    fn interpolate_path(&self, anchors: &[Point]) -> Vec<Point> {
        if anchors.len() < 2 {
            return anchors.to_vec();
        }
        let mut points = Vec::new();
        for pair in anchors.windows(2) {
            let steps = step_count(pair[0].distance_to(pair[1]), self.config.speed);
            let leg = interpolate_line(pair[0], pair[1], steps);
            if points.is_empty() {
                points.extend(leg);
            } else {
                points.extend(leg.into_iter().skip(1));
            }
        }
        points
    }
}
