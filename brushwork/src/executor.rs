//! Verified action execution.
//!
//! The executor is the last line before the platform driver. It refuses to
//! act unless the target zone exists and the cursor is already inside it,
//! which keeps navigation mistakes from turning into clicks on whatever
//! happened to be under the cursor. Failures come back as values in the
//! [`ActionResult`]; an `Err` never crosses this boundary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{debug, instrument, warn};

use crate::core::action::{Action, ActionKind, ActionResult};
use crate::core::event::{SpatialEvent, SpatialEventKind};
use crate::core::geometry::Point;
use crate::core::zone::Zone;
use crate::io::platform::{MouseButton, PlatformDriver};
use crate::registry::ZoneRegistry;

pub struct ActionExecutor<D: PlatformDriver> {
    driver: Arc<D>,
    registry: Arc<ZoneRegistry>,
}

impl<D: PlatformDriver> ActionExecutor<D> {
    pub fn new(driver: Arc<D>, registry: Arc<ZoneRegistry>) -> Self {
        Self { driver, registry }
    }

    /// Run one action against its target zone.
    ///
    /// Both gates reject the action before it ever starts: the zone must be
    /// registered, and the cursor must already sit inside its bounds.
    #[instrument(skip_all, fields(kind = action.kind.as_str(), zone = %action.target_zone_id))]
    pub fn execute(&self, mut action: Action, now: Duration) -> ActionResult {
        let Some(zone) = self.registry.get(&action.target_zone_id) else {
            let message = format!("zone not found: {}", action.target_zone_id);
            action.fail(&message);
            return ActionResult::failed(action, message);
        };

        let cursor = match self.driver.cursor_pos() {
            Ok(cursor) => cursor,
            Err(err) => {
                let message = format!("cursor position unavailable: {err:#}");
                action.fail(&message);
                return ActionResult::failed(action, message);
            }
        };
        if !zone.bounds.contains(cursor) {
            let message = format!(
                "cursor not in target zone {}: at ({}, {})",
                zone.id, cursor.x, cursor.y
            );
            action.fail(&message);
            return ActionResult::failed(action, message);
        }

        action.begin();
        match self.dispatch(&action, &zone, now) {
            Ok((message, events)) => {
                debug!(result = %message, "action completed");
                action.finish(message);
                ActionResult::completed(action, events)
            }
            Err(err) => {
                let message = format!("{err:#}");
                action.fail(&message);
                ActionResult::failed(action, message)
            }
        }
    }

    fn dispatch(
        &self,
        action: &Action,
        zone: &Zone,
        now: Duration,
    ) -> Result<(String, Vec<SpatialEvent>)> {
        let target = self.action_point(action, zone);
        match action.kind {
            ActionKind::Click | ActionKind::DoubleClick => {
                let button = self.button_param(action)?;
                let double = action.kind == ActionKind::DoubleClick;
                if double {
                    self.driver.double_click(target, button)?;
                } else {
                    self.driver.click(target, button)?;
                }
                let mut event =
                    SpatialEvent::new(SpatialEventKind::ZoneClick, &zone.id, now, target)
                        .with_data("button", button.as_str());
                if double {
                    event = event.with_data("double", true);
                }
                let verb = if double { "double-clicked" } else { "clicked" };
                Ok((
                    format!("{verb} {} at ({}, {})", zone.id, target.x, target.y),
                    vec![event],
                ))
            }
            ActionKind::TypeText => {
                let Some(text) = action.param_str("text") else {
                    bail!("missing text parameter");
                };
                self.driver.type_text(text)?;
                let event = SpatialEvent::new(
                    SpatialEventKind::ZoneType,
                    &zone.id,
                    now,
                    zone.bounds.center(),
                )
                .with_data("text", text);
                Ok((format!("typed {} chars into {}", text.len(), zone.id), vec![event]))
            }
            ActionKind::KeyPress => {
                let Some(key) = action.param_str("key") else {
                    bail!("missing key parameter");
                };
                self.driver.key_press(key)?;
                Ok((format!("pressed {key}"), Vec::new()))
            }
            ActionKind::Scroll => {
                let amount = action.param_i64("amount").unwrap_or(3) as i32;
                let direction = action.param_str("direction").unwrap_or("down");
                let signed = if direction == "down" { -amount } else { amount };
                self.driver.scroll(target, signed)?;
                Ok((
                    format!("scrolled {signed} at ({}, {})", target.x, target.y),
                    Vec::new(),
                ))
            }
            ActionKind::Move => {
                self.driver.move_cursor(target)?;
                Ok((format!("moved to ({}, {})", target.x, target.y), Vec::new()))
            }
            ActionKind::Drag => {
                warn!(zone = %zone.id, "drag is not implemented, treating as no-op");
                Ok(("drag not implemented, no-op".to_string(), Vec::new()))
            }
        }
    }

    /// Explicit x/y params win over the zone center.
    fn action_point(&self, action: &Action, zone: &Zone) -> Point {
        match (action.param_i64("x"), action.param_i64("y")) {
            (Some(x), Some(y)) => Point::new(x as i32, y as i32),
            _ => zone.bounds.center(),
        }
    }

    fn button_param(&self, action: &Action) -> Result<MouseButton> {
        match action.param_str("button") {
            None => Ok(MouseButton::Left),
            Some(s) => match MouseButton::parse(s) {
                Some(button) => Ok(button),
                None => bail!("unknown mouse button: {s}"),
            },
        }
    }
}
