//! Stable exit codes for brushwork CLI commands.

/// Command succeeded; for `run`, the task completed.
pub const OK: i32 = 0;
/// Invalid arguments, scenario, plan, or config, or an internal error.
pub const INVALID: i32 = 1;
/// `run` finished without completing the task.
pub const TASK_FAILED: i32 = 2;
/// `run` stopped because the API call budget ran out.
pub const BUDGET_EXCEEDED: i32 = 3;
