//! Spatial events observed while the brush moves across zones.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialEventKind {
    ZoneEnter,
    ZoneExit,
    ZoneHover,
    ZoneClick,
    ZoneType,
    BrushLost,
}

/// One observation of brush/zone interaction. Immutable once emitted;
/// consumers append it to history buffers and read it for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialEvent {
    pub kind: SpatialEventKind,
    /// Zone the event refers to; empty for `brush_lost`.
    #[serde(default)]
    pub zone_id: String,
    #[serde(rename = "timestamp_ms", with = "crate::core::timestamp::millis")]
    pub timestamp: Duration,
    pub position: Point,
    /// Free-form payload, e.g. `duration_ms`, `button`, `text`, `expected_zone`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl SpatialEvent {
    pub fn new(
        kind: SpatialEventKind,
        zone_id: impl Into<String>,
        timestamp: Duration,
        position: Point,
    ) -> Self {
        Self {
            kind,
            zone_id: zone_id.into(),
            timestamp,
            position,
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}
