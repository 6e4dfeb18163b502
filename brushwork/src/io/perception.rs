//! Perception backends that refresh the zone registry.
//!
//! In production this is where a vision pass would rescan the screen.
//! The scenario-backed implementation rereads a scenario file, which
//! doubles as a test seam: a run can swap the file between recaptures
//! to simulate UI change.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::io::scenario::{apply_scenario, load_scenario};
use crate::registry::ZoneRegistry;

/// What a recapture found.
#[derive(Debug, Clone, Copy)]
pub struct RecaptureReport {
    /// Zones in the registry after the refresh.
    pub refreshed: usize,
}

/// Abstraction over canvas re-analysis backends.
pub trait Perception {
    fn recapture(&self) -> Result<RecaptureReport>;
}

/// Perception that reloads zones from a scenario file.
pub struct ScenarioPerception {
    registry: Arc<ZoneRegistry>,
    path: PathBuf,
}

impl ScenarioPerception {
    pub fn new(registry: Arc<ZoneRegistry>, path: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            path: path.into(),
        }
    }
}

impl Perception for ScenarioPerception {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn recapture(&self) -> Result<RecaptureReport> {
        let scenario = load_scenario(&self.path)?;
        let refreshed = apply_scenario(&scenario, &self.registry)?;
        debug!(refreshed, "reloaded zones from scenario");
        Ok(RecaptureReport { refreshed })
    }
}

/// Perception that never changes anything.
///
/// Used when no zone source is available. Recaptures succeed and leave
/// the registry untouched.
pub struct NullPerception;

impl Perception for NullPerception {
    fn recapture(&self) -> Result<RecaptureReport> {
        Ok(RecaptureReport { refreshed: 0 })
    }
}
