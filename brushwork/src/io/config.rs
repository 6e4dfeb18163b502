//! Tool configuration loaded from a TOML file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::brush::BrushConfig;
use crate::director::{DirectorConfig, default_recapture_keywords};
use crate::motion::MotionConfig;
use crate::tracker::TrackerConfig;

/// Top-level configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable
/// and automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrushworkConfig {
    pub motion: MotionSection,
    pub tracker: TrackerSection,
    pub registry: RegistrySection,
    pub brush: BrushSection,
    pub director: DirectorSection,
    pub planner: PlannerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionSection {
    /// Cursor speed in pixels per second.
    pub speed_pps: f64,
    /// Row spacing for exploratory sweeps, in pixels.
    pub scan_spacing: u32,
}

impl Default for MotionSection {
    fn default() -> Self {
        Self {
            speed_pps: 1500.0,
            scan_spacing: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerSection {
    /// Dwell time before a hover event fires, in milliseconds.
    pub hover_threshold_ms: u64,
    /// Spatial events kept in the in-memory ring.
    pub history_limit: usize,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            hover_threshold_ms: 500,
            history_limit: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistrySection {
    /// Zones unseen for longer than this are dropped before planning.
    pub zone_expiry_secs: u64,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            zone_expiry_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrushSection {
    /// Pause between cursor waypoints, in milliseconds.
    pub waypoint_delay_ms: u64,
    /// Verify the cursor landed inside the target zone after moving.
    pub verify_cursor: bool,
}

impl Default for BrushSection {
    fn default() -> Self {
        Self {
            waypoint_delay_ms: 16,
            verify_cursor: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DirectorSection {
    pub max_api_calls: u32,
    pub max_replans: u32,
    pub max_step_retries: u32,
    pub step_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub recapture_keywords: Vec<String>,
}

impl Default for DirectorSection {
    fn default() -> Self {
        Self {
            max_api_calls: 30,
            max_replans: 5,
            max_step_retries: 3,
            step_delay_ms: 500,
            retry_delay_ms: 250,
            recapture_keywords: default_recapture_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerSection {
    /// Command to invoke for planning (e.g. `["claude","-p"]`). May be
    /// empty when runs always supply a plan file.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Truncate planner stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
    /// Maximum bytes for the planner prompt before dropping sections.
    pub prompt_budget_bytes: usize,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
            prompt_budget_bytes: 40_000,
        }
    }
}

impl Default for BrushworkConfig {
    fn default() -> Self {
        Self {
            motion: MotionSection::default(),
            tracker: TrackerSection::default(),
            registry: RegistrySection::default(),
            brush: BrushSection::default(),
            director: DirectorSection::default(),
            planner: PlannerSection::default(),
        }
    }
}

impl BrushworkConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.motion.speed_pps.is_finite() || self.motion.speed_pps <= 0.0 {
            return Err(anyhow!("motion.speed_pps must be a positive number"));
        }
        if self.motion.scan_spacing == 0 {
            return Err(anyhow!("motion.scan_spacing must be > 0"));
        }
        if self.tracker.history_limit == 0 {
            return Err(anyhow!("tracker.history_limit must be >= 1"));
        }
        if self.director.max_step_retries == 0 {
            return Err(anyhow!("director.max_step_retries must be >= 1"));
        }
        if self.planner.timeout_secs == 0 {
            return Err(anyhow!("planner.timeout_secs must be > 0"));
        }
        if self.planner.output_limit_bytes == 0 {
            return Err(anyhow!("planner.output_limit_bytes must be > 0"));
        }
        if self.planner.prompt_budget_bytes == 0 {
            return Err(anyhow!("planner.prompt_budget_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn motion_config(&self) -> MotionConfig {
        MotionConfig {
            speed: self.motion.speed_pps,
            scan_spacing: self.motion.scan_spacing,
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            hover_threshold: Duration::from_millis(self.tracker.hover_threshold_ms),
            history_limit: self.tracker.history_limit,
        }
    }

    pub fn brush_config(&self) -> BrushConfig {
        BrushConfig {
            waypoint_delay: Duration::from_millis(self.brush.waypoint_delay_ms),
            verify_cursor: self.brush.verify_cursor,
        }
    }

    pub fn director_config(&self) -> DirectorConfig {
        DirectorConfig {
            max_api_calls: self.director.max_api_calls,
            max_replans: self.director.max_replans,
            max_step_retries: self.director.max_step_retries,
            step_delay: Duration::from_millis(self.director.step_delay_ms),
            retry_delay: Duration::from_millis(self.director.retry_delay_ms),
            recapture_keywords: self.director.recapture_keywords.clone(),
            zone_expiry: Duration::from_secs(self.registry.zone_expiry_secs),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BrushworkConfig::default()`.
pub fn load_config(path: &Path) -> Result<BrushworkConfig> {
    if !path.exists() {
        let cfg = BrushworkConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BrushworkConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, BrushworkConfig::default());
    }

    /// Partial files override only what they mention.
    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[motion]\nspeed_pps = 900.0\n\n[director]\nmax_replans = 2\n",
        )
        .expect("write config");

        let cfg = load_config(&path).expect("load");

        assert_eq!(cfg.motion.speed_pps, 900.0);
        assert_eq!(cfg.motion.scan_spacing, 50);
        assert_eq!(cfg.director.max_replans, 2);
        assert_eq!(cfg.director.max_api_calls, 30);
        assert_eq!(cfg.planner.timeout_secs, 120);
    }

    #[test]
    fn zero_scan_spacing_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[motion]\nscan_spacing = 0\n").expect("write config");

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("scan_spacing"));
    }

    #[test]
    fn converters_carry_section_values() {
        let cfg = BrushworkConfig {
            brush: BrushSection {
                waypoint_delay_ms: 0,
                verify_cursor: false,
            },
            registry: RegistrySection { zone_expiry_secs: 5 },
            ..BrushworkConfig::default()
        };

        assert_eq!(cfg.brush_config().waypoint_delay, Duration::ZERO);
        assert!(!cfg.brush_config().verify_cursor);
        assert_eq!(cfg.director_config().zone_expiry, Duration::from_secs(5));
        assert_eq!(cfg.tracker_config().history_limit, 256);
    }
}
