//! Input and capture abstraction over the machine being driven.
//!
//! [`PlatformDriver`] is the only seam between the control layers and a real
//! desktop. [`SimulatedDriver`] implements it over an in-memory screen and
//! records every input it receives, which is what the test suite and the
//! scenario runner drive against.

use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" => Some(MouseButton::Middle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

/// One captured screen image. `data` is raw RGBA, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: String,
    pub title: String,
    pub bounds: Rect,
    pub focused: bool,
}

/// Low-level input and capture operations.
///
/// Implementations take `&self`; any interior state is their own concern.
/// Every call can fail, since a real backend talks to a display server.
pub trait PlatformDriver {
    fn capture_frame(&self) -> Result<Frame>;
    fn cursor_pos(&self) -> Result<Point>;
    fn move_cursor(&self, to: Point) -> Result<()>;
    fn click(&self, at: Point, button: MouseButton) -> Result<()>;
    fn double_click(&self, at: Point, button: MouseButton) -> Result<()>;
    fn scroll(&self, at: Point, amount: i32) -> Result<()>;
    fn type_text(&self, text: &str) -> Result<()>;
    fn key_press(&self, key: &str) -> Result<()>;
    fn screen_size(&self) -> Result<(u32, u32)>;
    fn active_window(&self) -> Result<Option<WindowInfo>>;
    fn list_windows(&self) -> Result<Vec<WindowInfo>>;
}

/// One recorded input, in the order the driver received it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum InputRecord {
    MoveCursor { to: Point },
    Click { at: Point, button: MouseButton, double: bool },
    Scroll { at: Point, amount: i32 },
    TypeText { text: String },
    KeyPress { key: String },
}

#[derive(Debug)]
struct SimState {
    cursor: Point,
    screen: (u32, u32),
    windows: Vec<WindowInfo>,
    journal: Vec<InputRecord>,
}

/// In-memory driver backing scenario runs and tests.
#[derive(Debug)]
pub struct SimulatedDriver {
    state: Mutex<SimState>,
}

impl SimulatedDriver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(SimState {
                cursor: Point::new(0, 0),
                screen: (width, height),
                windows: Vec::new(),
                journal: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_cursor(&self, at: Point) {
        self.lock().cursor = at;
    }

    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        self.lock().windows = windows;
    }

    /// Everything fed to the driver so far.
    pub fn journal(&self) -> Vec<InputRecord> {
        self.lock().journal.clone()
    }

    // Mirrors a physical pointer: it cannot leave the screen.
    fn clamp(&self, to: Point) -> Point {
        let (width, height) = self.lock().screen;
        Point::new(
            to.x.clamp(0, width.saturating_sub(1) as i32),
            to.y.clamp(0, height.saturating_sub(1) as i32),
        )
    }
}

impl PlatformDriver for SimulatedDriver {
    fn capture_frame(&self) -> Result<Frame> {
        let (width, height) = self.lock().screen;
        Ok(Frame {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        })
    }

    fn cursor_pos(&self) -> Result<Point> {
        Ok(self.lock().cursor)
    }

    fn move_cursor(&self, to: Point) -> Result<()> {
        let clamped = self.clamp(to);
        let mut state = self.lock();
        state.cursor = clamped;
        state.journal.push(InputRecord::MoveCursor { to: clamped });
        Ok(())
    }

    fn click(&self, at: Point, button: MouseButton) -> Result<()> {
        let clamped = self.clamp(at);
        let mut state = self.lock();
        state.cursor = clamped;
        state.journal.push(InputRecord::Click {
            at: clamped,
            button,
            double: false,
        });
        Ok(())
    }

    fn double_click(&self, at: Point, button: MouseButton) -> Result<()> {
        let clamped = self.clamp(at);
        let mut state = self.lock();
        state.cursor = clamped;
        state.journal.push(InputRecord::Click {
            at: clamped,
            button,
            double: true,
        });
        Ok(())
    }

    fn scroll(&self, at: Point, amount: i32) -> Result<()> {
        let clamped = self.clamp(at);
        self.lock().journal.push(InputRecord::Scroll {
            at: clamped,
            amount,
        });
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<()> {
        self.lock().journal.push(InputRecord::TypeText {
            text: text.to_string(),
        });
        Ok(())
    }

    fn key_press(&self, key: &str) -> Result<()> {
        self.lock().journal.push(InputRecord::KeyPress {
            key: key.to_string(),
        });
        Ok(())
    }

    fn screen_size(&self) -> Result<(u32, u32)> {
        Ok(self.lock().screen)
    }

    fn active_window(&self) -> Result<Option<WindowInfo>> {
        Ok(self.lock().windows.iter().find(|w| w.focused).cloned())
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(self.lock().windows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_records_inputs_in_order() {
        let driver = SimulatedDriver::new(800, 600);
        driver.move_cursor(Point::new(10, 20)).expect("move");
        driver.click(Point::new(10, 20), MouseButton::Left).expect("click");
        driver.type_text("hi").expect("type");

        let journal = driver.journal();
        assert_eq!(
            journal,
            vec![
                InputRecord::MoveCursor {
                    to: Point::new(10, 20)
                },
                InputRecord::Click {
                    at: Point::new(10, 20),
                    button: MouseButton::Left,
                    double: false,
                },
                InputRecord::TypeText {
                    text: "hi".to_string()
                },
            ]
        );
    }

    #[test]
    fn cursor_is_clamped_to_the_screen() {
        let driver = SimulatedDriver::new(800, 600);
        driver.move_cursor(Point::new(5000, -4)).expect("move");
        assert_eq!(driver.cursor_pos().expect("pos"), Point::new(799, 0));
    }

    #[test]
    fn active_window_picks_the_focused_one() {
        let driver = SimulatedDriver::new(800, 600);
        driver.set_windows(vec![
            WindowInfo {
                id: "a".to_string(),
                title: "Editor".to_string(),
                bounds: Rect::new(0, 0, 400, 300),
                focused: false,
            },
            WindowInfo {
                id: "b".to_string(),
                title: "Dialog".to_string(),
                bounds: Rect::new(100, 100, 200, 150),
                focused: true,
            },
        ]);

        let active = driver.active_window().expect("query").expect("focused window");
        assert_eq!(active.id, "b");
        assert_eq!(driver.list_windows().expect("list").len(), 2);
    }
}
