//! Task orchestration: plan, execute, recover, within hard budgets.
//!
//! The [`Director`] owns the plan-execute-recover loop. It asks a
//! [`TaskPlanner`] for steps, runs them through the [`StepExecutor`],
//! and on failure follows the classifier's recommendation: retry the
//! step, request a fresh plan, or rebuild the zone registry through
//! [`Perception`] first. Budgets on API calls, replans, and per-step
//! attempts bound every run; a task that cannot finish inside them
//! fails instead of looping.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::classifier::{ErrorKind, RecoveryAction, classify};
use crate::core::timestamp::to_millis;
use crate::io::perception::Perception;
use crate::io::planner::{PlanRequest, TaskPlanner};
use crate::io::platform::PlatformDriver;
use crate::registry::ZoneRegistry;
use crate::step::{REPLAN_ZONE_ID, StepExecutor, StepResult, TaskStep};

pub(crate) fn default_recapture_keywords() -> Vec<String> {
    [
        "window",
        "dialog",
        "open",
        "launch",
        "appear",
        "application",
        "save as",
        "menu",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Budgets and pacing for a task run.
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    /// Hard cap on planner and perception calls per task.
    pub max_api_calls: u32,
    /// How many times a task may request a fresh plan after the first.
    pub max_replans: u32,
    /// Attempts per step before the failure escalates past retry.
    pub max_step_retries: u32,
    /// Pause after each successful step, letting the UI settle.
    pub step_delay: Duration,
    /// Pause between attempts of the same step.
    pub retry_delay: Duration,
    /// An `expected_change` hint containing any of these triggers a
    /// recapture after the step succeeds.
    pub recapture_keywords: Vec<String>,
    /// Zones unseen for longer than this are dropped before planning.
    pub zone_expiry: Duration,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            max_api_calls: 30,
            max_replans: 5,
            max_step_retries: 3,
            step_delay: Duration::from_millis(500),
            retry_delay: Duration::from_millis(250),
            recapture_keywords: default_recapture_keywords(),
            zone_expiry: Duration::from_secs(30),
        }
    }
}

/// How a task run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Every step of the current plan finished.
    Completed,
    /// The planner declined, a step aborted, or replans ran out.
    Failed,
    /// The API call budget ran out before the plan finished.
    BudgetExceeded,
}

/// Summary of one task run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub success: bool,
    pub outcome: TaskOutcome,
    /// Steps finished in the plan that was active when the run ended.
    pub steps_completed: usize,
    pub steps_total: usize,
    pub step_results: Vec<StepResult>,
    pub plans_used: u32,
    pub api_calls_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Default)]
struct RunState {
    step_results: Vec<StepResult>,
    steps_completed: usize,
    steps_total: usize,
    plans_used: u32,
    replans_used: u32,
    api_calls: u32,
}

impl RunState {
    fn into_result(
        self,
        outcome: TaskOutcome,
        error: Option<String>,
        duration_ms: u64,
    ) -> TaskResult {
        TaskResult {
            success: outcome == TaskOutcome::Completed,
            outcome,
            steps_completed: self.steps_completed,
            steps_total: self.steps_total,
            step_results: self.step_results,
            plans_used: self.plans_used,
            api_calls_used: self.api_calls,
            error,
            duration_ms,
        }
    }
}

/// Drives a task from natural-language goal to finished plan.
pub struct Director<D: PlatformDriver, P: TaskPlanner, C: Perception> {
    steps: StepExecutor<D>,
    planner: P,
    perception: C,
    registry: Arc<ZoneRegistry>,
    config: DirectorConfig,
    epoch: Instant,
}

impl<D: PlatformDriver, P: TaskPlanner, C: Perception> Director<D, P, C> {
    pub fn new(
        steps: StepExecutor<D>,
        planner: P,
        perception: C,
        registry: Arc<ZoneRegistry>,
        config: DirectorConfig,
    ) -> Self {
        Self {
            steps,
            planner,
            perception,
            registry,
            config,
            epoch: Instant::now(),
        }
    }

    /// Run one task to completion or to a budget limit.
    ///
    /// Never returns `Err`: infrastructure failures fold into a failed
    /// [`TaskResult`] so the caller always gets budgets and step
    /// history.
    #[instrument(skip_all, fields(task_len = task.len()))]
    pub fn execute_task(&mut self, task: &str) -> TaskResult {
        let started = self.session_now();
        let mut state = RunState::default();
        let mut completed: Vec<TaskStep> = Vec::new();
        debug!(task, "starting task");

        let mut plan = match self.replace_plan(task, &completed, &mut state) {
            Ok(steps) => steps,
            Err(message) => return self.finish(state, TaskOutcome::Failed, Some(message), started),
        };
        let mut index = 0usize;

        loop {
            if state.api_calls >= self.config.max_api_calls {
                return self.finish(
                    state,
                    TaskOutcome::BudgetExceeded,
                    Some(format!(
                        "api call budget exceeded ({})",
                        self.config.max_api_calls
                    )),
                    started,
                );
            }
            let Some(step) = plan.get(index).cloned() else {
                return self.finish(state, TaskOutcome::Completed, None, started);
            };

            if step.zone_id == REPLAN_ZONE_ID {
                if state.replans_used >= self.config.max_replans {
                    return self.finish(
                        state,
                        TaskOutcome::Failed,
                        Some(format!(
                            "replan budget exceeded ({})",
                            self.config.max_replans
                        )),
                        started,
                    );
                }
                self.recapture(&mut state);
                state.replans_used += 1;
                match self.replace_plan(task, &completed, &mut state) {
                    Ok(next) => {
                        plan = next;
                        index = 0;
                    }
                    Err(message) => {
                        return self.finish(state, TaskOutcome::Failed, Some(message), started);
                    }
                }
                continue;
            }

            let (result, attempts) = self.execute_step_with_retries(&step);
            let success = result.success;
            let error_kind = result.error_kind;
            let message = result.message.clone();
            state.step_results.push(result);

            if success {
                completed.push(step.clone());
                state.steps_completed += 1;
                index += 1;
                if !self.config.step_delay.is_zero() {
                    thread::sleep(self.config.step_delay);
                }
                if self.should_recapture_after(&step) {
                    self.recapture(&mut state);
                }
                continue;
            }

            let kind = error_kind.unwrap_or(ErrorKind::Unknown);
            let mut classification = classify(kind, &message, attempts.saturating_sub(1));
            if classification.recovery == RecoveryAction::Retry {
                // The retry loop already spent this step's attempts.
                classification = classification.escalate();
            }
            warn!(
                zone = %step.zone_id,
                kind = ?kind,
                recovery = ?classification.recovery,
                attempts,
                "step failed"
            );

            match classification.recovery {
                RecoveryAction::Retry | RecoveryAction::Replan | RecoveryAction::Reanalyze => {
                    if state.replans_used >= self.config.max_replans {
                        return self.finish(
                            state,
                            TaskOutcome::Failed,
                            Some(format!(
                                "replan budget exceeded ({})",
                                self.config.max_replans
                            )),
                            started,
                        );
                    }
                    if classification.should_reanalyze_canvas {
                        self.recapture(&mut state);
                    }
                    state.replans_used += 1;
                    match self.replace_plan(task, &completed, &mut state) {
                        Ok(next) => {
                            plan = next;
                            index = 0;
                        }
                        Err(message) => {
                            return self.finish(state, TaskOutcome::Failed, Some(message), started);
                        }
                    }
                }
                RecoveryAction::Skip => {
                    index += 1;
                }
                RecoveryAction::Abort => {
                    return self.finish(
                        state,
                        TaskOutcome::Failed,
                        Some(classification.description),
                        started,
                    );
                }
            }
        }
    }

    /// Time since this director was constructed. All zone timestamps and
    /// event times run on this clock.
    pub fn session_now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn finish(
        &self,
        state: RunState,
        outcome: TaskOutcome,
        error: Option<String>,
        started: Duration,
    ) -> TaskResult {
        let duration_ms = to_millis(self.session_now().saturating_sub(started));
        debug!(
            outcome = ?outcome,
            steps_completed = state.steps_completed,
            api_calls = state.api_calls,
            duration_ms,
            "task finished"
        );
        state.into_result(outcome, error, duration_ms)
    }

    /// Ask the planner for steps and install them as the active plan.
    ///
    /// `Err` carries a human-readable reason the run must fail: planner
    /// infrastructure broke, the planner declined, or it returned no
    /// steps.
    fn replace_plan(
        &mut self,
        task: &str,
        completed: &[TaskStep],
        state: &mut RunState,
    ) -> Result<Vec<TaskStep>, String> {
        let expired = self
            .registry
            .expire_stale(self.session_now(), self.config.zone_expiry);
        if !expired.is_empty() {
            debug!(expired = expired.len(), "dropped stale zones before planning");
        }

        let request = PlanRequest {
            task: task.to_string(),
            zones: self.registry.snapshot(),
            completed: completed.to_vec(),
        };
        let outcome = match self.planner.plan(&request) {
            Ok(outcome) => outcome,
            Err(err) => return Err(format!("planner error: {err:#}")),
        };
        state.api_calls += outcome.api_calls_used;
        if !outcome.success {
            return Err(outcome
                .error
                .unwrap_or_else(|| "planner declined the task".to_string()));
        }
        if outcome.steps.is_empty() {
            return Err("planner returned an empty plan".to_string());
        }

        state.plans_used += 1;
        state.steps_total = outcome.steps.len();
        state.steps_completed = 0;
        debug!(steps = outcome.steps.len(), "installed a fresh plan");
        Ok(outcome.steps)
    }

    /// Run one step up to `max_step_retries` times, as long as the
    /// classifier keeps recommending retry. Returns the last result and
    /// the number of attempts spent.
    fn execute_step_with_retries(&mut self, step: &TaskStep) -> (StepResult, u32) {
        let mut attempt = 0u32;
        loop {
            let result = self.steps.execute(step, self.session_now());
            if result.success {
                return (result, attempt + 1);
            }

            let kind = result.error_kind.unwrap_or(ErrorKind::Unknown);
            let classification = classify(kind, &result.message, attempt);
            attempt += 1;
            if classification.recovery != RecoveryAction::Retry
                || attempt >= self.config.max_step_retries
            {
                return (result, attempt);
            }

            debug!(zone = %step.zone_id, attempt, "retrying step");
            if !self.config.retry_delay.is_zero() {
                thread::sleep(self.config.retry_delay);
            }
        }
    }

    fn should_recapture_after(&self, step: &TaskStep) -> bool {
        if step.expected_change.is_empty() {
            return false;
        }
        let hint = step.expected_change.to_lowercase();
        self.config
            .recapture_keywords
            .iter()
            .any(|keyword| hint.contains(keyword.to_lowercase().as_str()))
    }

    /// One perception pass. Always bills an API call; a failed pass is
    /// logged and the run continues with the zones it has.
    fn recapture(&mut self, state: &mut RunState) {
        state.api_calls += 1;
        match self.perception.recapture() {
            Ok(report) => debug!(refreshed = report.refreshed, "canvas recaptured"),
            Err(err) => warn!("recapture failed, keeping current zones: {err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::BrushConfig;
    use crate::io::planner::PlanOutcome;
    use crate::io::platform::SimulatedDriver;
    use crate::motion::MotionConfig;
    use crate::step::GLOBAL_ZONE_ID;
    use crate::test_support::{PlannedResponse, ScriptedPerception, ScriptedPlanner, step, zone};
    use crate::tracker::TrackerConfig;

    fn quick_config() -> DirectorConfig {
        DirectorConfig {
            step_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            ..DirectorConfig::default()
        }
    }

    fn fast_executor(
        driver: &Arc<SimulatedDriver>,
        registry: &Arc<ZoneRegistry>,
    ) -> StepExecutor<SimulatedDriver> {
        StepExecutor::new(
            Arc::clone(driver),
            Arc::clone(registry),
            BrushConfig {
                waypoint_delay: Duration::ZERO,
                verify_cursor: true,
            },
            TrackerConfig::default(),
            MotionConfig::default(),
        )
    }

    /// Verifies a one-step plan runs to completion with correct accounting.
    #[test]
    fn completes_a_single_step_plan() {
        let driver = Arc::new(SimulatedDriver::new(800, 600));
        let registry = Arc::new(ZoneRegistry::default());
        registry
            .register(zone("btn", 100, 100, 50, 50))
            .expect("register");

        let planner =
            ScriptedPlanner::new(vec![PlannedResponse::Plan(vec![step("btn", "click")])]);
        let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
        let mut director = Director::new(
            fast_executor(&driver, &registry),
            planner,
            perception,
            Arc::clone(&registry),
            quick_config(),
        );

        let result = director.execute_task("press the button");

        assert!(result.success);
        assert_eq!(result.outcome, TaskOutcome::Completed);
        assert_eq!(result.steps_completed, 1);
        assert_eq!(result.steps_total, 1);
        assert_eq!(result.plans_used, 1);
        assert_eq!(result.api_calls_used, 1);
        assert_eq!(result.step_results.len(), 1);
    }

    /// A replan sentinel recaptures the canvas and installs the next plan.
    #[test]
    fn replan_sentinel_requests_a_fresh_plan() {
        let driver = Arc::new(SimulatedDriver::new(800, 600));
        let registry = Arc::new(ZoneRegistry::default());
        registry
            .register(zone("first", 100, 100, 50, 50))
            .expect("register");
        registry
            .register(zone("second", 300, 100, 50, 50))
            .expect("register");

        let planner = ScriptedPlanner::new(vec![
            PlannedResponse::Plan(vec![step("first", "click"), step(REPLAN_ZONE_ID, "click")]),
            PlannedResponse::Plan(vec![step("second", "click")]),
        ]);
        let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
        let probe = perception.clone();
        let mut director = Director::new(
            fast_executor(&driver, &registry),
            planner,
            perception,
            Arc::clone(&registry),
            quick_config(),
        );

        let result = director.execute_task("click both buttons");

        assert!(result.success);
        assert_eq!(result.plans_used, 2);
        assert_eq!(probe.calls(), 1);
        // Two planner calls plus one recapture.
        assert_eq!(result.api_calls_used, 3);
        assert_eq!(result.steps_completed, 1);
        assert_eq!(result.step_results.len(), 2);
    }

    /// An expected_change hint naming UI change triggers a recapture.
    #[test]
    fn expected_change_keyword_triggers_recapture() {
        let driver = Arc::new(SimulatedDriver::new(800, 600));
        let registry = Arc::new(ZoneRegistry::default());
        registry
            .register(zone("btn", 100, 100, 50, 50))
            .expect("register");

        let mut opening = step("btn", "click");
        opening.expected_change = "the Save As dialog appears".to_string();
        let planner = ScriptedPlanner::new(vec![PlannedResponse::Plan(vec![opening])]);
        let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
        let probe = perception.clone();
        let mut director = Director::new(
            fast_executor(&driver, &registry),
            planner,
            perception,
            Arc::clone(&registry),
            quick_config(),
        );

        let result = director.execute_task("open the save dialog");

        assert!(result.success);
        assert_eq!(probe.calls(), 1);
        assert_eq!(result.api_calls_used, 2);
    }

    #[test]
    fn planner_infrastructure_error_fails_the_task() {
        let driver = Arc::new(SimulatedDriver::new(800, 600));
        let registry = Arc::new(ZoneRegistry::default());
        let planner = ScriptedPlanner::new(vec![PlannedResponse::Fail(
            "model endpoint unreachable".to_string(),
        )]);
        let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
        let mut director = Director::new(
            fast_executor(&driver, &registry),
            planner,
            perception,
            Arc::clone(&registry),
            quick_config(),
        );

        let result = director.execute_task("do anything");

        assert!(!result.success);
        assert_eq!(result.outcome, TaskOutcome::Failed);
        let error = result.error.expect("error");
        assert!(error.contains("planner error"));
        assert!(error.contains("model endpoint unreachable"));
    }

    /// A planner that declines fails the task with its own reason, and
    /// the declined call still counts against the budget.
    #[test]
    fn declined_plan_fails_with_planner_reason() {
        let driver = Arc::new(SimulatedDriver::new(800, 600));
        let registry = Arc::new(ZoneRegistry::default());
        let planner = ScriptedPlanner::new(vec![PlannedResponse::Outcome(PlanOutcome {
            steps: Vec::new(),
            success: false,
            error: Some("no path to goal".to_string()),
            api_calls_used: 1,
        })]);
        let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
        let mut director = Director::new(
            fast_executor(&driver, &registry),
            planner,
            perception,
            Arc::clone(&registry),
            quick_config(),
        );

        let result = director.execute_task("reach the goal");

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no path to goal"));
        assert_eq!(result.api_calls_used, 1);
    }

    /// Zones unseen past the expiry are dropped before the plan request.
    #[test]
    fn stale_zones_expire_before_planning() {
        let driver = Arc::new(SimulatedDriver::new(800, 600));
        let registry = Arc::new(ZoneRegistry::default());
        registry
            .register(zone("stale", 10, 10, 20, 20))
            .expect("register");

        let mut quit = step(GLOBAL_ZONE_ID, "key_press");
        quit.params.insert("key".to_string(), "ctrl+q".into());
        let planner = ScriptedPlanner::new(vec![PlannedResponse::Plan(vec![quit])]);
        let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
        let config = DirectorConfig {
            zone_expiry: Duration::ZERO,
            ..quick_config()
        };
        let mut director = Director::new(
            fast_executor(&driver, &registry),
            planner,
            perception,
            Arc::clone(&registry),
            config,
        );

        std::thread::sleep(Duration::from_millis(2));
        let result = director.execute_task("quit the app");

        assert!(result.success);
        assert!(!registry.contains("stale"));
    }
}
