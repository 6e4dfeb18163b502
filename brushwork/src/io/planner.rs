//! Planner abstraction for turning a task into executable steps.
//!
//! The [`TaskPlanner`] trait decouples the director from the planning
//! backend (typically an LLM wrapped in a CLI). Tests use scripted
//! planners that return predetermined outcomes without spawning
//! processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::zone::Zone;
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::PromptBuilder;
use crate::io::scenario::{load_plan, validate_schema};
use crate::step::TaskStep;

/// JSON Schema that planner command output must satisfy.
pub const PLAN_OUTPUT_SCHEMA: &str = include_str!("../../schemas/plan_output.schema.json");

/// Everything a planner needs to produce a plan.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Natural-language description of the task.
    pub task: String,
    /// Zones currently known to the registry.
    pub zones: Vec<Zone>,
    /// Steps already completed, oldest first.
    pub completed: Vec<TaskStep>,
}

/// Outcome of a planning call.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Steps to execute, in order.
    pub steps: Vec<TaskStep>,
    /// Whether the planner produced a usable plan.
    pub success: bool,
    /// Planner-reported reason when it declined the task.
    pub error: Option<String>,
    /// Model or API calls the backend spent on this outcome.
    pub api_calls_used: u32,
}

/// Abstraction over planning backends.
///
/// `Err` means the backend itself broke (process failure, malformed
/// output). An unsuccessful [`PlanOutcome`] means the backend ran fine
/// and answered that the task cannot be planned.
pub trait TaskPlanner {
    fn plan(&self, request: &PlanRequest) -> Result<PlanOutcome>;
}

/// Planner that pipes a rendered prompt to an external command and
/// reads a plan back from its stdout.
#[derive(Debug)]
pub struct CliPlanner {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    prompt_budget_bytes: usize,
}

impl CliPlanner {
    pub fn new(
        command: Vec<String>,
        timeout: Duration,
        output_limit_bytes: usize,
        prompt_budget_bytes: usize,
    ) -> Result<Self> {
        if command.is_empty() {
            bail!("planner command must not be empty");
        }
        Ok(Self {
            command,
            timeout,
            output_limit_bytes,
            prompt_budget_bytes,
        })
    }
}

impl TaskPlanner for CliPlanner {
    #[instrument(skip_all, fields(command = %self.command[0], timeout_secs = self.timeout.as_secs()))]
    fn plan(&self, request: &PlanRequest) -> Result<PlanOutcome> {
        let prompt = PromptBuilder::new(self.prompt_budget_bytes)
            .build_planner(request)
            .render();

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .context("run planner command")?;

        if output.timed_out {
            warn!(
                timeout_secs = self.timeout.as_secs(),
                "planner command timed out"
            );
            bail!("planner command timed out after {:?}", self.timeout);
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(exit_code = ?output.status.code(), "planner command failed");
            bail!(
                "planner command failed with status {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let outcome = parse_plan_output(&stdout)?;
        debug!(
            steps = outcome.steps.len(),
            success = outcome.success,
            "planner replied"
        );
        Ok(outcome)
    }
}

/// Wire shape of planner command output.
#[derive(Debug, Deserialize)]
struct PlannerOutput {
    steps: Vec<TaskStep>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_plan_output(stdout: &str) -> Result<PlanOutcome> {
    let value: Value =
        serde_json::from_str(stdout.trim()).context("parse planner output as JSON")?;
    validate_schema(&value, PLAN_OUTPUT_SCHEMA, "planner output")?;
    let parsed: PlannerOutput =
        serde_json::from_value(value).context("decode planner output")?;
    let success = parsed.error.is_none();
    Ok(PlanOutcome {
        steps: parsed.steps,
        success,
        error: parsed.error,
        api_calls_used: 1,
    })
}

/// Planner that replays a fixed plan from disk.
///
/// Reports zero API calls, so replayed plans never count against the
/// call budget.
pub struct FilePlanner {
    path: PathBuf,
}

impl FilePlanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TaskPlanner for FilePlanner {
    fn plan(&self, _request: &PlanRequest) -> Result<PlanOutcome> {
        let steps = load_plan(&self.path)?;
        Ok(PlanOutcome {
            steps,
            success: true,
            error: None,
            api_calls_used: 0,
        })
    }
}
