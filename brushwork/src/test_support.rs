//! Test-only helpers: deterministic constructors and scripted doubles.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, bail};

use crate::core::geometry::{Point, Rect};
use crate::core::zone::{Zone, ZoneKind};
use crate::io::perception::{Perception, RecaptureReport};
use crate::io::planner::{PlanOutcome, PlanRequest, TaskPlanner};
use crate::io::platform::{Frame, MouseButton, PlatformDriver, SimulatedDriver, WindowInfo};
use crate::registry::ZoneRegistry;
use crate::step::TaskStep;

/// Create an enabled button zone with default fields.
pub fn zone(id: &str, x: i32, y: i32, width: u32, height: u32) -> Zone {
    Zone::new(id, Rect::new(x, y, width, height), ZoneKind::Button)
}

/// Create a bare plan step with no params.
pub fn step(zone_id: impl Into<String>, action: impl Into<String>) -> TaskStep {
    TaskStep {
        zone_id: zone_id.into(),
        action: action.into(),
        params: serde_json::Map::new(),
        description: String::new(),
        expected_change: String::new(),
    }
}

/// One scripted planner reply.
#[derive(Clone)]
pub enum PlannedResponse {
    /// A successful plan with these steps.
    Plan(Vec<TaskStep>),
    /// A full outcome, for declined plans or custom call accounting.
    Outcome(PlanOutcome),
    /// An infrastructure failure with this message.
    Fail(String),
}

/// Planner double that replays scripted responses.
///
/// Clones share the same script and call counter, so a test can keep a
/// probe while the director owns the planner. An exhausted script is an
/// infrastructure error.
#[derive(Clone)]
pub struct ScriptedPlanner {
    script: Arc<Mutex<VecDeque<PlannedResponse>>>,
    repeat: Option<PlannedResponse>,
    calls: Arc<Mutex<u32>>,
}

impl ScriptedPlanner {
    pub fn new(responses: Vec<PlannedResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into())),
            repeat: None,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// A planner that returns the same response on every call.
    pub fn repeating(response: PlannedResponse) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            repeat: Some(response),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskPlanner for ScriptedPlanner {
    fn plan(&self, _request: &PlanRequest) -> Result<PlanOutcome> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .or_else(|| self.repeat.clone());
        let Some(response) = next else {
            bail!("planner script exhausted");
        };
        match response {
            PlannedResponse::Plan(steps) => Ok(PlanOutcome {
                steps,
                success: true,
                error: None,
                api_calls_used: 1,
            }),
            PlannedResponse::Outcome(outcome) => Ok(outcome),
            PlannedResponse::Fail(message) => bail!(message),
        }
    }
}

/// Perception double that optionally injects zone sets on recapture.
///
/// Clones share state, so a test can keep a probe for the call count.
/// When the injection queue is empty, recaptures succeed and change
/// nothing.
#[derive(Clone)]
pub struct ScriptedPerception {
    registry: Arc<ZoneRegistry>,
    injections: Arc<Mutex<VecDeque<Vec<Zone>>>>,
    calls: Arc<Mutex<u32>>,
}

impl ScriptedPerception {
    pub fn new(registry: Arc<ZoneRegistry>, injections: Vec<Vec<Zone>>) -> Self {
        Self {
            registry,
            injections: Arc::new(Mutex::new(injections.into())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Perception for ScriptedPerception {
    fn recapture(&self) -> Result<RecaptureReport> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let injection = self
            .injections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let refreshed = match injection {
            Some(zones) => self.registry.replace_all(zones)?,
            None => 0,
        };
        Ok(RecaptureReport { refreshed })
    }
}

/// Driver wrapper that fails or misreports selected operations.
pub struct FailingDriver {
    inner: SimulatedDriver,
    fail_clicks: bool,
    fail_keys: bool,
    stuck_cursor: Option<Point>,
}

impl FailingDriver {
    fn wrap(width: u32, height: u32) -> Self {
        Self {
            inner: SimulatedDriver::new(width, height),
            fail_clicks: false,
            fail_keys: false,
            stuck_cursor: None,
        }
    }

    /// Every click and double click returns an error.
    pub fn clicks_fail(width: u32, height: u32) -> Self {
        Self {
            fail_clicks: true,
            ..Self::wrap(width, height)
        }
    }

    /// Every key press and text entry returns an error.
    pub fn keys_fail(width: u32, height: u32) -> Self {
        Self {
            fail_keys: true,
            ..Self::wrap(width, height)
        }
    }

    /// Moves are swallowed and the cursor always reports `at`.
    pub fn stuck_cursor(width: u32, height: u32, at: Point) -> Self {
        Self {
            stuck_cursor: Some(at),
            ..Self::wrap(width, height)
        }
    }

    pub fn journal(&self) -> Vec<crate::io::platform::InputRecord> {
        self.inner.journal()
    }
}

impl PlatformDriver for FailingDriver {
    fn capture_frame(&self) -> Result<Frame> {
        self.inner.capture_frame()
    }

    fn cursor_pos(&self) -> Result<Point> {
        if let Some(at) = self.stuck_cursor {
            return Ok(at);
        }
        self.inner.cursor_pos()
    }

    fn move_cursor(&self, to: Point) -> Result<()> {
        if self.stuck_cursor.is_some() {
            return Ok(());
        }
        self.inner.move_cursor(to)
    }

    fn click(&self, at: Point, button: MouseButton) -> Result<()> {
        if self.fail_clicks {
            bail!("synthetic click failure");
        }
        self.inner.click(at, button)
    }

    fn double_click(&self, at: Point, button: MouseButton) -> Result<()> {
        if self.fail_clicks {
            bail!("synthetic click failure");
        }
        self.inner.double_click(at, button)
    }

    fn scroll(&self, at: Point, amount: i32) -> Result<()> {
        self.inner.scroll(at, amount)
    }

    fn type_text(&self, text: &str) -> Result<()> {
        if self.fail_keys {
            bail!("synthetic keyboard failure");
        }
        self.inner.type_text(text)
    }

    fn key_press(&self, key: &str) -> Result<()> {
        if self.fail_keys {
            bail!("synthetic keyboard failure");
        }
        self.inner.key_press(key)
    }

    fn screen_size(&self) -> Result<(u32, u32)> {
        self.inner.screen_size()
    }

    fn active_window(&self) -> Result<Option<WindowInfo>> {
        self.inner.active_window()
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        self.inner.list_windows()
    }
}
