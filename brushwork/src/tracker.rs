//! Per-frame cursor-to-zone tracking.
//!
//! The tracker turns a stream of cursor positions into discrete spatial
//! events: enter, exit after a measured dwell, and at most one hover per
//! visit. It also doubles as the session event log; other layers append
//! their click and type events through [`ZoneTracker::push_event`] so the
//! ring holds everything that happened since the last reset, in order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::core::event::{SpatialEvent, SpatialEventKind};
use crate::core::geometry::Point;
use crate::core::timestamp::to_millis;
use crate::core::zone::ZoneState;
use crate::registry::ZoneRegistry;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Dwell time inside a zone before a hover event fires.
    pub hover_threshold: Duration,
    /// Ring capacity of the event history.
    pub history_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            hover_threshold: Duration::from_millis(500),
            history_limit: 256,
        }
    }
}

pub struct ZoneTracker {
    registry: Arc<ZoneRegistry>,
    config: TrackerConfig,
    current_zone_id: Option<String>,
    enter_time: Duration,
    hover_emitted: bool,
    history: VecDeque<SpatialEvent>,
}

impl ZoneTracker {
    pub fn new(registry: Arc<ZoneRegistry>, config: TrackerConfig) -> Self {
        Self {
            registry,
            config,
            current_zone_id: None,
            enter_time: Duration::ZERO,
            hover_emitted: false,
            history: VecDeque::new(),
        }
    }

    /// Feed one cursor sample and collect the events it produced.
    ///
    /// When zones nest, the smallest zone under the cursor wins. Crossing
    /// directly from one zone into another emits the exit before the enter.
    /// The hover event fires once per visit, after the cursor has stayed in
    /// the same zone for the configured threshold.
    pub fn update(&mut self, position: Point, now: Duration) -> Vec<SpatialEvent> {
        let hit_id = self
            .registry
            .find_at_point(position)
            .into_iter()
            .next()
            .map(|zone| zone.id);

        let mut events = Vec::new();
        if hit_id != self.current_zone_id {
            if let Some(prev) = self.current_zone_id.take() {
                self.registry.modify(&prev, |zone| {
                    if zone.state == ZoneState::Hovered {
                        zone.state = ZoneState::Enabled;
                    }
                });
                let dwell = to_millis(now.saturating_sub(self.enter_time));
                events.push(
                    SpatialEvent::new(SpatialEventKind::ZoneExit, prev, now, position)
                        .with_data("duration_ms", dwell),
                );
            }
            if let Some(id) = hit_id.clone() {
                self.registry.modify(&id, |zone| {
                    if matches!(zone.state, ZoneState::Enabled | ZoneState::Unknown) {
                        zone.state = ZoneState::Hovered;
                    }
                });
                events.push(SpatialEvent::new(
                    SpatialEventKind::ZoneEnter,
                    id,
                    now,
                    position,
                ));
            }
            self.current_zone_id = hit_id;
            self.enter_time = now;
            self.hover_emitted = false;
        } else if let Some(id) = &self.current_zone_id {
            let dwell = now.saturating_sub(self.enter_time);
            if !self.hover_emitted && dwell >= self.config.hover_threshold {
                events.push(
                    SpatialEvent::new(SpatialEventKind::ZoneHover, id.clone(), now, position)
                        .with_data("duration_ms", to_millis(dwell)),
                );
                self.hover_emitted = true;
            }
        }

        if let Some(id) = &self.current_zone_id {
            self.registry.touch(id, now);
        }
        for event in &events {
            self.push_event(event.clone());
        }
        events
    }

    /// Append an externally produced event to the session log.
    pub fn push_event(&mut self, event: SpatialEvent) {
        self.history.push_back(event);
        while self.history.len() > self.config.history_limit {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> &VecDeque<SpatialEvent> {
        &self.history
    }

    pub fn current_zone_id(&self) -> Option<&str> {
        self.current_zone_id.as_deref()
    }

    /// Forget the current zone and drop the event history, without
    /// emitting an exit event.
    ///
    /// Used after the cursor is lost or the canvas is reanalyzed, when the
    /// tracked state no longer describes reality.
    pub fn reset(&mut self) {
        if let Some(prev) = self.current_zone_id.take() {
            self.registry.modify(&prev, |zone| {
                if zone.state == ZoneState::Hovered {
                    zone.state = ZoneState::Enabled;
                }
            });
        }
        self.enter_time = Duration::ZERO;
        self.hover_emitted = false;
        self.history.clear();
    }
}
