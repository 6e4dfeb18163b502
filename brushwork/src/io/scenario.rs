//! Scenario and plan files: load, schema-check, and apply.
//!
//! A scenario file describes a simulated screen for the runner to drive
//! against. Validation is layered: the embedded JSON Schema rejects
//! malformed documents with precise messages, then zone invariants and id
//! uniqueness are checked on the decoded values.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::geometry::Point;
use crate::core::zone::Zone;
use crate::registry::ZoneRegistry;
use crate::step::TaskStep;

const SCENARIO_SCHEMA: &str = include_str!("../../schemas/scenario.schema.json");
const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenSpec {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSpec {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// A simulated screen: its size, starting cursor, and zones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub screen: ScreenSpec,
    #[serde(default)]
    pub cursor: Point,
    pub zones: Vec<Zone>,
}

#[derive(Debug, Deserialize)]
struct PlanFile {
    steps: Vec<TaskStep>,
}

/// Load a scenario file, schema-checking before decoding.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read scenario {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse scenario {}", path.display()))?;
    validate_schema(&value, SCENARIO_SCHEMA, "scenario")?;
    let scenario: Scenario = serde_json::from_value(value).context("decode scenario")?;

    let mut seen = HashSet::new();
    for zone in &scenario.zones {
        zone.validate()?;
        if !seen.insert(zone.id.as_str()) {
            bail!("duplicate zone id: {}", zone.id);
        }
    }
    Ok(scenario)
}

/// Load a canned plan file of the same shape the planner would emit.
pub fn load_plan(path: &Path) -> Result<Vec<TaskStep>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse plan {}", path.display()))?;
    validate_schema(&value, PLAN_SCHEMA, "plan")?;
    let plan: PlanFile = serde_json::from_value(value).context("decode plan")?;
    Ok(plan.steps)
}

/// Replace the registry's contents with the scenario's zones.
pub fn apply_scenario(scenario: &Scenario, registry: &ZoneRegistry) -> Result<usize> {
    registry.replace_all(scenario.zones.clone())
}

/// Validate a JSON instance against an embedded JSON Schema (Draft 2020-12).
pub(crate) fn validate_schema(instance: &Value, schema_src: &str, what: &str) -> Result<()> {
    let schema: Value = serde_json::from_str(schema_src).context("parse embedded schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile json schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!(
            "{what} failed schema validation:\n- {}",
            messages.join("\n- ")
        );
    }
    Ok(())
}
