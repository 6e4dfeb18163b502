//! One planner step, executed and translated into a classifiable outcome.
//!
//! Steps arrive from the planner as data. The executor resolves the action
//! name, routes zone-targeted steps through the brush and global steps
//! straight to the driver, and folds whatever happened into a
//! [`StepResult`] whose `error_kind` feeds the classifier.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::brush::{BrushConfig, BrushController, NavigationResult};
use crate::core::action::{Action, ActionKind, ActionResult};
use crate::core::classifier::ErrorKind;
use crate::core::geometry::Point;
use crate::core::trajectory::TrajectoryKind;
use crate::io::platform::{MouseButton, PlatformDriver};
use crate::motion::MotionConfig;
use crate::registry::ZoneRegistry;
use crate::tracker::TrackerConfig;

/// Target id for steps that act on no particular zone, like a global
/// keyboard shortcut.
pub const GLOBAL_ZONE_ID: &str = "__global__";
/// Target id for steps that ask the director to stop and request a fresh
/// plan instead of acting.
pub const REPLAN_ZONE_ID: &str = "__replan__";

/// One step of a task plan, as the planner emits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStep {
    pub zone_id: String,
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub description: String,
    /// Free-text hint about what the screen should look like afterwards.
    #[serde(default)]
    pub expected_change: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub message: String,
    pub navigation: Option<NavigationResult>,
    pub action_result: Option<ActionResult>,
}

impl StepResult {
    fn completed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            error_kind: None,
            message: message.into(),
            navigation: None,
            action_result: None,
        }
    }

    fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            message: message.into(),
            navigation: None,
            action_result: None,
        }
    }
}

pub struct StepExecutor<D: PlatformDriver> {
    brush: BrushController<D>,
    driver: Arc<D>,
    registry: Arc<ZoneRegistry>,
}

impl<D: PlatformDriver> StepExecutor<D> {
    pub fn new(
        driver: Arc<D>,
        registry: Arc<ZoneRegistry>,
        brush_config: BrushConfig,
        tracker_config: TrackerConfig,
        motion_config: MotionConfig,
    ) -> Self {
        let brush = BrushController::new(
            Arc::clone(&driver),
            Arc::clone(&registry),
            brush_config,
            tracker_config,
            motion_config,
        );
        Self {
            brush,
            driver,
            registry,
        }
    }

    pub fn brush(&self) -> &BrushController<D> {
        &self.brush
    }

    /// Execute one step and fold the outcome into a [`StepResult`].
    #[instrument(skip_all, fields(zone = %step.zone_id, action = %step.action))]
    pub fn execute(&mut self, step: &TaskStep, now: Duration) -> StepResult {
        let Some(kind) = ActionKind::parse(&step.action) else {
            return StepResult::failed(
                ErrorKind::ActionFailed,
                format!("unknown action type: {}", step.action),
            );
        };

        if step.zone_id == GLOBAL_ZONE_ID {
            return self.execute_global(kind, step);
        }

        if !self.registry.contains(&step.zone_id) {
            return StepResult::failed(
                ErrorKind::ZoneNotFound,
                format!("zone not found: {}", step.zone_id),
            );
        }

        let mut action = Action::new(kind, &step.zone_id, now);
        action.params = step.params.clone();
        let outcome = self
            .brush
            .execute_action(action, TrajectoryKind::Safe, &[], now);

        if !outcome.navigation.success {
            let message = outcome
                .navigation
                .error
                .clone()
                .unwrap_or_else(|| "navigation failed".to_string());
            return StepResult {
                success: false,
                error_kind: Some(ErrorKind::BrushLost),
                message,
                navigation: Some(outcome.navigation),
                action_result: None,
            };
        }

        match outcome.action_result {
            Some(result) if result.success => StepResult {
                success: true,
                error_kind: None,
                message: result.action.result.clone(),
                navigation: Some(outcome.navigation),
                action_result: Some(result),
            },
            Some(result) => StepResult {
                success: false,
                error_kind: Some(ErrorKind::ActionFailed),
                message: result
                    .error
                    .clone()
                    .unwrap_or_else(|| "action failed".to_string()),
                navigation: Some(outcome.navigation),
                action_result: Some(result),
            },
            None => StepResult {
                success: true,
                error_kind: None,
                message: "navigation completed".to_string(),
                navigation: Some(outcome.navigation),
                action_result: None,
            },
        }
    }

    /// Global steps bypass navigation and the zone gates entirely.
    fn execute_global(&self, kind: ActionKind, step: &TaskStep) -> StepResult {
        let param_str = |key: &str| step.params.get(key).and_then(Value::as_str);
        let param_i64 = |key: &str| step.params.get(key).and_then(Value::as_i64);

        match kind {
            ActionKind::KeyPress => {
                let Some(key) = param_str("key") else {
                    return StepResult::failed(ErrorKind::ActionFailed, "missing key parameter");
                };
                match self.driver.key_press(key) {
                    Ok(()) => StepResult::completed(format!("pressed {key}")),
                    Err(err) => StepResult::failed(ErrorKind::ActionFailed, format!("{err:#}")),
                }
            }
            ActionKind::TypeText => {
                let Some(text) = param_str("text") else {
                    return StepResult::failed(ErrorKind::ActionFailed, "missing text parameter");
                };
                match self.driver.type_text(text) {
                    Ok(()) => StepResult::completed(format!("typed {} chars", text.len())),
                    Err(err) => StepResult::failed(ErrorKind::ActionFailed, format!("{err:#}")),
                }
            }
            ActionKind::Click => {
                let (Some(x), Some(y)) = (param_i64("x"), param_i64("y")) else {
                    return StepResult::failed(
                        ErrorKind::ActionFailed,
                        "global click requires x and y",
                    );
                };
                let button = match param_str("button") {
                    None => MouseButton::Left,
                    Some(name) => match MouseButton::parse(name) {
                        Some(button) => button,
                        None => {
                            return StepResult::failed(
                                ErrorKind::ActionFailed,
                                format!("unknown mouse button: {name}"),
                            );
                        }
                    },
                };
                let at = Point::new(x as i32, y as i32);
                match self.driver.click(at, button) {
                    Ok(()) => StepResult::completed(format!("clicked at ({}, {})", at.x, at.y)),
                    Err(err) => StepResult::failed(ErrorKind::ActionFailed, format!("{err:#}")),
                }
            }
            _ => StepResult::failed(
                ErrorKind::ActionFailed,
                format!("action {} not supported for global target", kind.as_str()),
            ),
        }
    }
}
