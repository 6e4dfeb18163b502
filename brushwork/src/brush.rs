//! The brush: navigate, verify arrival, then act.
//!
//! A brush controller owns one cursor. It walks planned trajectories
//! waypoint by waypoint, feeds every sample through the zone tracker, and
//! refuses to report a navigation as successful until the platform confirms
//! the cursor really is inside the target zone. Losing that confirmation
//! sets a sticky `brush_lost` flag that only a later verified arrival
//! clears.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::action::{Action, ActionKind, ActionResult};
use crate::core::event::{SpatialEvent, SpatialEventKind};
use crate::core::geometry::Point;
use crate::core::trajectory::{Trajectory, TrajectoryKind};
use crate::core::zone::Zone;
use crate::executor::ActionExecutor;
use crate::io::platform::PlatformDriver;
use crate::motion::{MotionConfig, MotionPlanner};
use crate::registry::ZoneRegistry;
use crate::tracker::{TrackerConfig, ZoneTracker};

#[derive(Debug, Clone)]
pub struct BrushConfig {
    /// Wall-clock pause between consecutive waypoints.
    pub waypoint_delay: Duration,
    /// Verify the cursor landed inside the target zone after walking.
    pub verify_cursor: bool,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            waypoint_delay: Duration::from_millis(16),
            verify_cursor: true,
        }
    }
}

/// What one navigation attempt produced.
#[derive(Debug, Clone, Serialize)]
pub struct NavigationResult {
    pub target_zone_id: String,
    pub trajectory: Option<Trajectory>,
    pub events: Vec<SpatialEvent>,
    pub final_pos: Option<Point>,
    pub success: bool,
    pub error: Option<String>,
}

/// Navigation plus the action it was carrying, if navigation got that far.
#[derive(Debug, Clone, Serialize)]
pub struct BrushActionOutcome {
    pub navigation: NavigationResult,
    pub action_result: Option<ActionResult>,
}

pub struct BrushController<D: PlatformDriver> {
    driver: Arc<D>,
    registry: Arc<ZoneRegistry>,
    tracker: ZoneTracker,
    planner: MotionPlanner,
    executor: ActionExecutor<D>,
    config: BrushConfig,
    brush_lost: bool,
}

impl<D: PlatformDriver> BrushController<D> {
    pub fn new(
        driver: Arc<D>,
        registry: Arc<ZoneRegistry>,
        config: BrushConfig,
        tracker_config: TrackerConfig,
        motion_config: MotionConfig,
    ) -> Self {
        let tracker = ZoneTracker::new(Arc::clone(&registry), tracker_config);
        let planner = MotionPlanner::new(Arc::clone(&registry), motion_config);
        let executor = ActionExecutor::new(Arc::clone(&driver), Arc::clone(&registry));
        Self {
            driver,
            registry,
            tracker,
            planner,
            executor,
            config,
            brush_lost: false,
        }
    }

    /// Plan and walk a trajectory to `target_id`, then verify arrival.
    ///
    /// Exploratory navigation sweeps the target zone's own bounds. The walk
    /// advances session time by one waypoint delay per hop, so tracker
    /// events carry the times the samples would occur at, not the call time.
    #[instrument(skip_all, fields(target = target_id, kind = ?kind))]
    pub fn navigate_to_zone(
        &mut self,
        target_id: &str,
        kind: TrajectoryKind,
        avoid: &[String],
        now: Duration,
    ) -> NavigationResult {
        let start = match self.driver.cursor_pos() {
            Ok(start) => start,
            Err(err) => {
                return self.navigation_failure(
                    target_id,
                    format!("cursor position unavailable: {err:#}"),
                    None,
                    Vec::new(),
                    None,
                );
            }
        };

        let planned = match kind {
            TrajectoryKind::Direct => self.planner.plan_direct(start, target_id),
            TrajectoryKind::Safe => self.planner.plan_safe(start, target_id, avoid),
            TrajectoryKind::Exploratory => self.registry.get(target_id).map_or_else(
                || Err(anyhow::anyhow!("zone not found: {target_id}")),
                |zone| {
                    let mut trajectory = self.planner.plan_exploratory(start, zone.bounds);
                    trajectory.target_zone_id = target_id.to_string();
                    Ok(trajectory)
                },
            ),
        };
        let trajectory = match planned {
            Ok(trajectory) => trajectory,
            Err(err) => {
                return self.navigation_failure(
                    target_id,
                    format!("{err:#}"),
                    None,
                    Vec::new(),
                    None,
                );
            }
        };

        let mut at = now;
        let mut events = Vec::new();
        let mut walk_error = None;
        for (i, point) in trajectory.points.iter().enumerate() {
            if i > 0 {
                if !self.config.waypoint_delay.is_zero() {
                    thread::sleep(self.config.waypoint_delay);
                }
                at += self.config.waypoint_delay;
            }
            if let Err(err) = self.driver.move_cursor(*point) {
                walk_error = Some(format!("cursor move failed: {err:#}"));
                break;
            }
            events.extend(self.tracker.update(*point, at));
        }
        if let Some(error) = walk_error {
            return self.navigation_failure(target_id, error, Some(trajectory), events, None);
        }

        let final_pos = match self.driver.cursor_pos() {
            Ok(pos) => pos,
            Err(err) => {
                return self.navigation_failure(
                    target_id,
                    format!("cursor position unavailable after walk: {err:#}"),
                    Some(trajectory),
                    events,
                    None,
                );
            }
        };

        if self.config.verify_cursor {
            let inside = self
                .registry
                .get(target_id)
                .is_some_and(|zone| zone.bounds.contains(final_pos));
            if !inside {
                let event = SpatialEvent::new(SpatialEventKind::BrushLost, "", at, final_pos)
                    .with_data("expected_zone", target_id);
                // Reset first: the cleared log restarts with the loss itself.
                self.tracker.reset();
                self.tracker.push_event(event.clone());
                events.push(event);
                self.brush_lost = true;
                warn!(target = target_id, x = final_pos.x, y = final_pos.y, "brush lost");
                return self.navigation_failure(
                    target_id,
                    format!("brush lost: cursor not in zone {target_id}"),
                    Some(trajectory),
                    events,
                    Some(final_pos),
                );
            }
        }

        self.brush_lost = false;
        debug!(waypoints = trajectory.points.len(), "navigation verified");
        NavigationResult {
            target_zone_id: target_id.to_string(),
            trajectory: Some(trajectory),
            events,
            final_pos: Some(final_pos),
            success: true,
            error: None,
        }
    }

    /// Navigate to the action's target zone, then run the action there.
    ///
    /// A failed navigation short-circuits; the action is never started. A
    /// `move` action is already satisfied by arriving, so it completes
    /// without touching the platform again.
    pub fn execute_action(
        &mut self,
        mut action: Action,
        kind: TrajectoryKind,
        avoid: &[String],
        now: Duration,
    ) -> BrushActionOutcome {
        let target = action.target_zone_id.clone();
        let navigation = self.navigate_to_zone(&target, kind, avoid, now);
        if !navigation.success {
            return BrushActionOutcome {
                navigation,
                action_result: None,
            };
        }

        let walked = navigation
            .trajectory
            .as_ref()
            .map_or(0, |t| t.points.len());
        let at = now + self.config.waypoint_delay * walked.saturating_sub(1) as u32;

        if action.kind == ActionKind::Move {
            let pos = navigation.final_pos.unwrap_or_default();
            action.begin();
            action.finish(format!("moved to ({}, {})", pos.x, pos.y));
            return BrushActionOutcome {
                navigation,
                action_result: Some(ActionResult::completed(action, Vec::new())),
            };
        }

        let result = self.executor.execute(action, at);
        for event in &result.events {
            self.tracker.push_event(event.clone());
        }
        BrushActionOutcome {
            navigation,
            action_result: Some(result),
        }
    }

    /// Sample the real cursor once and run it through the tracker.
    ///
    /// For callers that watch the cursor between navigations.
    pub fn update(&mut self, now: Duration) -> Result<Vec<SpatialEvent>> {
        let pos = self.driver.cursor_pos()?;
        Ok(self.tracker.update(pos, now))
    }

    pub fn current_zone(&self) -> Option<Zone> {
        self.tracker
            .current_zone_id()
            .and_then(|id| self.registry.get(id))
    }

    pub fn cursor_pos(&self) -> Result<Point> {
        self.driver.cursor_pos()
    }

    pub fn zones_at_cursor(&self) -> Result<Vec<Zone>> {
        Ok(self.registry.find_at_point(self.driver.cursor_pos()?))
    }

    pub fn is_brush_lost(&self) -> bool {
        self.brush_lost
    }

    pub fn zone_count(&self) -> usize {
        self.registry.len()
    }

    pub fn tracker(&self) -> &ZoneTracker {
        &self.tracker
    }

    fn navigation_failure(
        &self,
        target_id: &str,
        error: String,
        trajectory: Option<Trajectory>,
        events: Vec<SpatialEvent>,
        final_pos: Option<Point>,
    ) -> NavigationResult {
        NavigationResult {
            target_zone_id: target_id.to_string(),
            trajectory,
            events,
            final_pos,
            success: false,
            error: Some(error),
        }
    }
}
