//! End-to-end director runs over scripted planners and faulty drivers.
//!
//! These exercise the full stack below the CLI: planning, navigation,
//! action execution, failure classification, and budget enforcement.

use std::sync::Arc;
use std::time::Duration;

use brushwork::brush::BrushConfig;
use brushwork::core::event::SpatialEventKind;
use brushwork::core::geometry::Point;
use brushwork::director::{Director, DirectorConfig, TaskOutcome};
use brushwork::io::planner::PlanOutcome;
use brushwork::io::platform::{InputRecord, PlatformDriver, SimulatedDriver};
use brushwork::motion::MotionConfig;
use brushwork::registry::ZoneRegistry;
use brushwork::step::{GLOBAL_ZONE_ID, StepExecutor};
use brushwork::test_support::{
    FailingDriver, PlannedResponse, ScriptedPerception, ScriptedPlanner, step, zone,
};
use brushwork::tracker::TrackerConfig;

fn quick_config() -> DirectorConfig {
    DirectorConfig {
        step_delay: Duration::ZERO,
        retry_delay: Duration::ZERO,
        ..DirectorConfig::default()
    }
}

fn executor<D: PlatformDriver>(driver: &Arc<D>, registry: &Arc<ZoneRegistry>) -> StepExecutor<D> {
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

/// A healthy run walks the cursor into the zone, clicks, and reports
/// the navigation events it saw along the way.
#[test]
fn completed_run_reports_navigation_and_click() {
    let driver = Arc::new(SimulatedDriver::new(800, 600));
    let registry = Arc::new(ZoneRegistry::default());
    registry
        .register(zone("btn_ok", 100, 100, 200, 100))
        .expect("register");

    let planner = ScriptedPlanner::new(vec![PlannedResponse::Plan(vec![step("btn_ok", "click")])]);
    let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
    let mut director = Director::new(
        executor(&driver, &registry),
        planner,
        perception,
        Arc::clone(&registry),
        quick_config(),
    );

    let result = director.execute_task("press ok");

    assert!(result.success);
    assert_eq!(result.outcome, TaskOutcome::Completed);

    let first = &result.step_results[0];
    let nav = first.navigation.as_ref().expect("navigation");
    assert!(nav.success);
    assert!(
        nav.events
            .iter()
            .any(|event| event.kind == SpatialEventKind::ZoneEnter && event.zone_id == "btn_ok")
    );
    let action = first.action_result.as_ref().expect("action result");
    assert!(action.success);
    assert!(
        action
            .events
            .iter()
            .any(|event| event.kind == SpatialEventKind::ZoneClick)
    );
}

/// A click that always fails burns its retry, then replans until the
/// replan budget runs out.
#[test]
fn failing_clicks_exhaust_the_replan_budget() {
    let driver = Arc::new(FailingDriver::clicks_fail(800, 600));
    let registry = Arc::new(ZoneRegistry::default());
    registry
        .register(zone("btn", 100, 100, 50, 50))
        .expect("register");

    let planner = ScriptedPlanner::repeating(PlannedResponse::Plan(vec![step("btn", "click")]));
    let probe = planner.clone();
    let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
    let mut director = Director::new(
        executor(&driver, &registry),
        planner,
        perception,
        Arc::clone(&registry),
        quick_config(),
    );

    let result = director.execute_task("press the button");

    assert!(!result.success);
    assert_eq!(result.outcome, TaskOutcome::Failed);
    assert_eq!(result.plans_used, 6);
    assert_eq!(result.api_calls_used, 6);
    assert_eq!(probe.calls(), 6);
    assert!(
        result
            .error
            .expect("error")
            .contains("replan budget exceeded")
    );
    // Every attempt navigated; no click ever reached the platform.
    let journal = driver.journal();
    assert!(!journal.is_empty());
    assert!(
        journal
            .iter()
            .all(|record| matches!(record, InputRecord::MoveCursor { .. }))
    );
}

/// A cursor that never arrives loses the brush, recaptures, and
/// replans until the budget runs out.
#[test]
fn stuck_cursor_recaptures_then_fails() {
    let driver = Arc::new(FailingDriver::stuck_cursor(800, 600, Point::new(5, 5)));
    let registry = Arc::new(ZoneRegistry::default());
    registry
        .register(zone("btn", 100, 100, 50, 50))
        .expect("register");

    let planner = ScriptedPlanner::repeating(PlannedResponse::Plan(vec![step("btn", "click")]));
    let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
    let probe = perception.clone();
    let mut director = Director::new(
        executor(&driver, &registry),
        planner,
        perception,
        Arc::clone(&registry),
        quick_config(),
    );

    let result = director.execute_task("press the button");

    assert!(!result.success);
    assert_eq!(result.outcome, TaskOutcome::Failed);
    // Every brush loss recaptures before replanning.
    assert_eq!(probe.calls(), 5);
    assert_eq!(result.plans_used, 6);
    assert_eq!(result.api_calls_used, 11);
    assert_eq!(result.step_results.len(), 6);
}

/// A zone missing from the registry triggers reanalysis; a perception
/// pass that finds it lets the retried plan finish.
#[test]
fn reanalysis_recovers_a_missing_zone() {
    let driver = Arc::new(SimulatedDriver::new(800, 600));
    let registry = Arc::new(ZoneRegistry::default());
    registry
        .register(zone("panel", 0, 0, 300, 300))
        .expect("register");

    let planner = ScriptedPlanner::new(vec![
        PlannedResponse::Plan(vec![step("ghost", "click")]),
        PlannedResponse::Plan(vec![step("ghost", "click")]),
    ]);
    let injected = vec![
        zone("panel", 0, 0, 300, 300),
        zone("ghost", 400, 200, 80, 40),
    ];
    let perception = ScriptedPerception::new(Arc::clone(&registry), vec![injected]);
    let probe = perception.clone();
    let mut director = Director::new(
        executor(&driver, &registry),
        planner,
        perception,
        Arc::clone(&registry),
        quick_config(),
    );

    let result = director.execute_task("click the ghost button");

    assert!(result.success);
    assert_eq!(result.outcome, TaskOutcome::Completed);
    assert_eq!(probe.calls(), 1);
    assert_eq!(result.plans_used, 2);
    assert_eq!(result.api_calls_used, 3);
    assert_eq!(result.step_results.len(), 2);
    assert!(registry.contains("ghost"));
}

/// A planner that reports spending the whole budget stops the run
/// before any step executes.
#[test]
fn planner_reported_api_calls_hit_the_budget() {
    let driver = Arc::new(SimulatedDriver::new(800, 600));
    let registry = Arc::new(ZoneRegistry::default());
    registry
        .register(zone("btn", 100, 100, 50, 50))
        .expect("register");

    let planner = ScriptedPlanner::new(vec![PlannedResponse::Outcome(PlanOutcome {
        steps: vec![step("btn", "click")],
        success: true,
        error: None,
        api_calls_used: 30,
    })]);
    let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
    let mut director = Director::new(
        executor(&driver, &registry),
        planner,
        perception,
        Arc::clone(&registry),
        quick_config(),
    );

    let result = director.execute_task("press the button");

    assert!(!result.success);
    assert_eq!(result.outcome, TaskOutcome::BudgetExceeded);
    assert_eq!(result.steps_completed, 0);
    assert!(result.step_results.is_empty());
    assert_eq!(result.api_calls_used, 30);
}

/// Keyboard failures on a global step retry once and then replan.
#[test]
fn failing_global_keys_follow_the_action_failed_ladder() {
    let driver = Arc::new(FailingDriver::keys_fail(800, 600));
    let registry = Arc::new(ZoneRegistry::default());

    let mut shortcut = step(GLOBAL_ZONE_ID, "key_press");
    shortcut
        .params
        .insert("key".to_string(), "ctrl+s".into());
    let planner = ScriptedPlanner::new(vec![
        PlannedResponse::Plan(vec![shortcut]),
        PlannedResponse::Outcome(PlanOutcome {
            steps: Vec::new(),
            success: false,
            error: Some("cannot save without a keyboard".to_string()),
            api_calls_used: 1,
        }),
    ]);
    let perception = ScriptedPerception::new(Arc::clone(&registry), Vec::new());
    let mut director = Director::new(
        executor(&driver, &registry),
        planner,
        perception,
        Arc::clone(&registry),
        quick_config(),
    );

    let result = director.execute_task("save the document");

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("cannot save without a keyboard"));
    assert_eq!(result.api_calls_used, 2);
    // The failed step spent its retry before the replan.
    assert_eq!(result.step_results.len(), 1);
}
