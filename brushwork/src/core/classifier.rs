//! Stateless mapping from failures to recovery actions.
//!
//! Classification never looks at task state: the same (kind, attempt) pair
//! always yields the same recommendation. Only the
//! [`Director`](crate::director::Director) and its per-step retry loop act on
//! the recommendation; lower layers never retry on their own.

use serde::{Deserialize, Serialize};

/// Failure taxonomy for step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ZoneNotFound,
    WrongZone,
    Timeout,
    BrushLost,
    ActionFailed,
    TaskImpossible,
    Unknown,
}

/// What the director should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Run the same step again.
    Retry,
    /// Discard remaining steps and request a fresh plan.
    Replan,
    /// Rebuild the zone registry via perception, then replan.
    Reanalyze,
    /// Give up on this step and move to the next one.
    Skip,
    /// Fail the task.
    Abort,
}

/// A recovery recommendation for one observed failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub error_kind: ErrorKind,
    pub recovery: RecoveryAction,
    /// Attempts after which this kind stops being worth its cheap recovery.
    pub max_retries: u32,
    pub description: String,
    pub should_reanalyze_canvas: bool,
}

impl ErrorClassification {
    /// Everything short of abort keeps the task alive.
    pub fn should_continue(&self) -> bool {
        self.recovery != RecoveryAction::Abort
    }

    /// One rung up the ladder: retry -> replan -> reanalyze -> abort,
    /// skip -> abort. Abort is a fixed point.
    pub fn escalate(&self) -> ErrorClassification {
        let recovery = match self.recovery {
            RecoveryAction::Retry => RecoveryAction::Replan,
            RecoveryAction::Replan => RecoveryAction::Reanalyze,
            RecoveryAction::Reanalyze | RecoveryAction::Skip | RecoveryAction::Abort => {
                RecoveryAction::Abort
            }
        };
        ErrorClassification {
            error_kind: self.error_kind,
            recovery,
            max_retries: self.max_retries,
            description: self.description.clone(),
            should_reanalyze_canvas: recovery == RecoveryAction::Reanalyze,
        }
    }
}

/// Classify a failure into a recovery recommendation.
///
/// `attempt` is 0-based: the first failure of a step classifies with
/// `attempt = 0`. Each kind escalates past its threshold:
///
/// - `zone_not_found`: reanalyze once, then abort
/// - `wrong_zone`: replan twice, then abort
/// - `timeout`: retry twice, then replan
/// - `brush_lost`: retry twice, then reanalyze
/// - `action_failed`: retry once, then replan
/// - `task_impossible`: always abort
/// - `unknown`: retry once, then abort
pub fn classify(kind: ErrorKind, description: &str, attempt: u32) -> ErrorClassification {
    let (recovery, max_retries) = match kind {
        ErrorKind::ZoneNotFound => {
            if attempt < 1 {
                (RecoveryAction::Reanalyze, 1)
            } else {
                (RecoveryAction::Abort, 1)
            }
        }
        ErrorKind::WrongZone => {
            if attempt < 2 {
                (RecoveryAction::Replan, 2)
            } else {
                (RecoveryAction::Abort, 2)
            }
        }
        ErrorKind::Timeout => {
            if attempt < 2 {
                (RecoveryAction::Retry, 2)
            } else {
                (RecoveryAction::Replan, 2)
            }
        }
        ErrorKind::BrushLost => {
            if attempt < 2 {
                (RecoveryAction::Retry, 2)
            } else {
                (RecoveryAction::Reanalyze, 2)
            }
        }
        ErrorKind::ActionFailed => {
            if attempt < 1 {
                (RecoveryAction::Retry, 1)
            } else {
                (RecoveryAction::Replan, 1)
            }
        }
        ErrorKind::TaskImpossible => (RecoveryAction::Abort, 0),
        ErrorKind::Unknown => {
            if attempt < 1 {
                (RecoveryAction::Retry, 1)
            } else {
                (RecoveryAction::Abort, 1)
            }
        }
    };

    ErrorClassification {
        error_kind: kind,
        recovery,
        max_retries,
        description: description.to_string(),
        should_reanalyze_canvas: recovery == RecoveryAction::Reanalyze,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_per_kind_thresholds() {
        let cases = [
            (ErrorKind::ZoneNotFound, 0, RecoveryAction::Reanalyze),
            (ErrorKind::ZoneNotFound, 1, RecoveryAction::Abort),
            (ErrorKind::WrongZone, 1, RecoveryAction::Replan),
            (ErrorKind::WrongZone, 2, RecoveryAction::Abort),
            (ErrorKind::Timeout, 1, RecoveryAction::Retry),
            (ErrorKind::Timeout, 2, RecoveryAction::Replan),
            (ErrorKind::BrushLost, 1, RecoveryAction::Retry),
            (ErrorKind::BrushLost, 2, RecoveryAction::Reanalyze),
            (ErrorKind::ActionFailed, 0, RecoveryAction::Retry),
            (ErrorKind::ActionFailed, 1, RecoveryAction::Replan),
            (ErrorKind::TaskImpossible, 0, RecoveryAction::Abort),
            (ErrorKind::Unknown, 0, RecoveryAction::Retry),
            (ErrorKind::Unknown, 1, RecoveryAction::Abort),
        ];
        for (kind, attempt, expected) in cases {
            let classification = classify(kind, "err", attempt);
            assert_eq!(
                classification.recovery, expected,
                "{kind:?} at attempt {attempt}"
            );
        }
    }

    #[test]
    fn reanalyze_flag_follows_recovery_action() {
        assert!(classify(ErrorKind::ZoneNotFound, "gone", 0).should_reanalyze_canvas);
        assert!(classify(ErrorKind::BrushLost, "lost", 2).should_reanalyze_canvas);
        assert!(!classify(ErrorKind::BrushLost, "lost", 0).should_reanalyze_canvas);
        assert!(!classify(ErrorKind::Timeout, "slow", 0).should_reanalyze_canvas);
    }

    #[test]
    fn escalate_is_monotonic_and_idempotent_at_abort() {
        let start = classify(ErrorKind::Timeout, "slow", 0);
        assert_eq!(start.recovery, RecoveryAction::Retry);

        let first = start.escalate();
        assert_eq!(first.recovery, RecoveryAction::Replan);
        let second = first.escalate();
        assert_eq!(second.recovery, RecoveryAction::Reanalyze);
        assert!(second.should_reanalyze_canvas);
        let third = second.escalate();
        assert_eq!(third.recovery, RecoveryAction::Abort);
        assert_eq!(third.escalate().recovery, RecoveryAction::Abort);
    }

    #[test]
    fn escalate_sends_skip_to_abort() {
        let skip = ErrorClassification {
            error_kind: ErrorKind::ActionFailed,
            recovery: RecoveryAction::Skip,
            max_retries: 0,
            description: "optional step".to_string(),
            should_reanalyze_canvas: false,
        };
        assert_eq!(skip.escalate().recovery, RecoveryAction::Abort);
    }

    #[test]
    fn only_abort_stops_the_task() {
        assert!(classify(ErrorKind::Timeout, "slow", 0).should_continue());
        assert!(classify(ErrorKind::ZoneNotFound, "gone", 0).should_continue());
        assert!(!classify(ErrorKind::TaskImpossible, "nope", 0).should_continue());
    }
}
