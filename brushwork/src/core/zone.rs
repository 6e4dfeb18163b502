//! Zone model: typed rectangular regions of interest on screen.

use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::geometry::Rect;

/// Interaction role the perception tier assigned to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Button,
    TextField,
    Link,
    Dropdown,
    Checkbox,
    Slider,
    MenuItem,
    Tab,
    ScrollArea,
    Static,
    Unknown,
}

impl ZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Button => "button",
            ZoneKind::TextField => "text_field",
            ZoneKind::Link => "link",
            ZoneKind::Dropdown => "dropdown",
            ZoneKind::Checkbox => "checkbox",
            ZoneKind::Slider => "slider",
            ZoneKind::MenuItem => "menu_item",
            ZoneKind::Tab => "tab",
            ZoneKind::ScrollArea => "scroll_area",
            ZoneKind::Static => "static",
            ZoneKind::Unknown => "unknown",
        }
    }
}

/// Last observed interaction state of a zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneState {
    Enabled,
    Disabled,
    Focused,
    Hovered,
    Pressed,
    Checked,
    Unchecked,
    Expanded,
    Collapsed,
    #[default]
    Unknown,
}

impl ZoneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneState::Enabled => "enabled",
            ZoneState::Disabled => "disabled",
            ZoneState::Focused => "focused",
            ZoneState::Hovered => "hovered",
            ZoneState::Pressed => "pressed",
            ZoneState::Checked => "checked",
            ZoneState::Unchecked => "unchecked",
            ZoneState::Expanded => "expanded",
            ZoneState::Collapsed => "collapsed",
            ZoneState::Unknown => "unknown",
        }
    }
}

/// A rectangular, typed, stateful region of interest on screen.
///
/// Zones are produced by an external perception tier and live in the
/// [`ZoneRegistry`](crate::registry::ZoneRegistry). `parent_id` is a weak
/// lookup key, never an owning reference: resolving it goes back through the
/// registry and may legitimately miss once the parent expires. `last_seen` is
/// a session-relative offset (see [`crate::core::timestamp`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub bounds: Rect,
    pub kind: ZoneKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub state: ZoneState,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, rename = "last_seen_ms", with = "crate::core::timestamp::millis")]
    pub last_seen: Duration,
}

fn default_confidence() -> f64 {
    1.0
}

impl Zone {
    /// Create an enabled zone with full confidence, as perception would for a
    /// freshly observed element.
    pub fn new(id: impl Into<String>, bounds: Rect, kind: ZoneKind) -> Self {
        Self {
            id: id.into(),
            bounds,
            kind,
            label: String::new(),
            state: ZoneState::Enabled,
            parent_id: None,
            confidence: 1.0,
            last_seen: Duration::ZERO,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_state(mut self, state: ZoneState) -> Self {
        self.state = state;
        self
    }

    pub fn with_last_seen(mut self, last_seen: Duration) -> Self {
        self.last_seen = last_seen;
        self
    }

    /// Invariants the registry enforces on every insert.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("zone id must not be empty");
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            bail!(
                "zone {} confidence {} outside [0, 1]",
                self.id,
                self.confidence
            );
        }
        Ok(())
    }
}

/// Field diff applied by [`ZoneRegistry::update`](crate::registry::ZoneRegistry::update).
///
/// `parent_id` is doubly optional: `None` leaves it untouched, `Some(None)`
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct ZonePatch {
    pub bounds: Option<Rect>,
    pub kind: Option<ZoneKind>,
    pub label: Option<String>,
    pub state: Option<ZoneState>,
    pub parent_id: Option<Option<String>>,
    pub confidence: Option<f64>,
    pub last_seen: Option<Duration>,
}

impl ZonePatch {
    pub fn apply(&self, zone: &mut Zone) {
        if let Some(bounds) = self.bounds {
            zone.bounds = bounds;
        }
        if let Some(kind) = self.kind {
            zone.kind = kind;
        }
        if let Some(label) = &self.label {
            zone.label = label.clone();
        }
        if let Some(state) = self.state {
            zone.state = state;
        }
        if let Some(parent_id) = &self.parent_id {
            zone.parent_id = parent_id.clone();
        }
        if let Some(confidence) = self.confidence {
            zone.confidence = confidence;
        }
        if let Some(last_seen) = self.last_seen {
            zone.last_seen = last_seen;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Point;

    #[test]
    fn validate_rejects_empty_id_and_bad_confidence() {
        let mut zone = Zone::new("ok", Rect::new(0, 0, 10, 10), ZoneKind::Button);
        assert!(zone.validate().is_ok());

        zone.id = "  ".to_string();
        assert!(zone.validate().is_err());

        zone.id = "ok".to_string();
        zone.confidence = 1.5;
        assert!(zone.validate().is_err());
        zone.confidence = f64::NAN;
        assert!(zone.validate().is_err());
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut zone = Zone::new("z", Rect::new(0, 0, 10, 10), ZoneKind::Button)
            .with_label("Save")
            .with_state(ZoneState::Enabled);
        let patch = ZonePatch {
            state: Some(ZoneState::Disabled),
            parent_id: Some(Some("panel".to_string())),
            ..ZonePatch::default()
        };

        patch.apply(&mut zone);
        assert_eq!(zone.state, ZoneState::Disabled);
        assert_eq!(zone.parent_id.as_deref(), Some("panel"));
        assert_eq!(zone.label, "Save");
        assert_eq!(zone.bounds, Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn zone_json_defaults_optional_fields() {
        let zone: Zone = serde_json::from_str(
            r#"{"id":"btn","bounds":{"x":1,"y":2,"width":3,"height":4},"kind":"button"}"#,
        )
        .expect("parse zone");
        assert_eq!(zone.state, ZoneState::Unknown);
        assert_eq!(zone.confidence, 1.0);
        assert_eq!(zone.last_seen, Duration::ZERO);
        assert!(zone.bounds.contains(Point::new(2, 3)));
    }
}
