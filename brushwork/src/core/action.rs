//! Input actions and their one-way lifecycle.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::event::SpatialEvent;

/// Closed set of input action types.
///
/// The wire format carries action types as strings; [`ActionKind::parse`] is
/// the single mapping from that world into the enum, and an unrecognized
/// string is a typed failure at the call site rather than a lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    DoubleClick,
    TypeText,
    KeyPress,
    Scroll,
    Drag,
    Move,
}

impl ActionKind {
    pub fn parse(s: &str) -> Option<ActionKind> {
        match s {
            "click" => Some(ActionKind::Click),
            "double_click" => Some(ActionKind::DoubleClick),
            "type_text" => Some(ActionKind::TypeText),
            "key_press" => Some(ActionKind::KeyPress),
            "scroll" => Some(ActionKind::Scroll),
            "drag" => Some(ActionKind::Drag),
            "move" => Some(ActionKind::Move),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::DoubleClick => "double_click",
            ActionKind::TypeText => "type_text",
            ActionKind::KeyPress => "key_press",
            ActionKind::Scroll => "scroll",
            ActionKind::Drag => "drag",
            ActionKind::Move => "move",
        }
    }
}

/// Lifecycle: pending -> in_progress -> {completed, failed}, one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Failed)
    }
}

/// A single input action aimed at a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub target_zone_id: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(rename = "timestamp_ms", with = "crate::core::timestamp::millis")]
    pub timestamp: Duration,
    /// Human-readable outcome; empty until the action reaches a terminal state.
    #[serde(default)]
    pub result: String,
}

impl Action {
    pub fn new(kind: ActionKind, target_zone_id: impl Into<String>, timestamp: Duration) -> Self {
        Self {
            kind,
            target_zone_id: target_zone_id.into(),
            status: ActionStatus::Pending,
            params: Map::new(),
            timestamp,
            result: String::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }

    /// Pending -> InProgress. Ignored from any other state.
    pub fn begin(&mut self) {
        if self.status == ActionStatus::Pending {
            self.status = ActionStatus::InProgress;
        }
    }

    /// InProgress -> Completed. Ignored from any other state.
    pub fn finish(&mut self, result: impl Into<String>) {
        if self.status == ActionStatus::InProgress {
            self.status = ActionStatus::Completed;
            self.result = result.into();
        }
    }

    /// Pending | InProgress -> Failed. A gate rejection fails an action that
    /// never started. Ignored once terminal.
    pub fn fail(&mut self, result: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = ActionStatus::Failed;
            self.result = result.into();
        }
    }
}

/// Terminal report for one executed action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub action: Action,
    pub success: bool,
    pub error: Option<String>,
    pub events: Vec<SpatialEvent>,
}

impl ActionResult {
    pub fn completed(action: Action, events: Vec<SpatialEvent>) -> Self {
        Self {
            action,
            success: true,
            error: None,
            events,
        }
    }

    pub fn failed(action: Action, error: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            error: Some(error.into()),
            events: Vec::new(),
        }
    }
}
