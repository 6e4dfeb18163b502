//! GUI-automation agent CLI over simulated scenarios.
//!
//! Loads a scenario (screen size, cursor, zones) into a simulated
//! driver and either inspects it (`check`, `zones`, `plan`) or runs a
//! task against it (`run`). Results print to stdout as JSON; exit codes
//! are stable per [`brushwork::exit_codes`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use brushwork::core::geometry::Point;
use brushwork::director::{Director, TaskOutcome};
use brushwork::exit_codes;
use brushwork::io::config::{BrushworkConfig, load_config};
use brushwork::io::perception::ScenarioPerception;
use brushwork::io::planner::{CliPlanner, FilePlanner, TaskPlanner};
use brushwork::io::platform::SimulatedDriver;
use brushwork::io::scenario::{apply_scenario, load_plan, load_scenario};
use brushwork::logging;
use brushwork::motion::MotionPlanner;
use brushwork::registry::ZoneRegistry;
use brushwork::step::StepExecutor;

#[derive(Parser)]
#[command(
    name = "brushwork",
    version,
    about = "GUI-automation agent control core"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a scenario file, and optionally a plan file.
    Check {
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Print a scenario's zones, optionally only those under a point.
    Zones {
        #[arg(long)]
        scenario: PathBuf,
        /// Point as "X,Y"; prints only zones containing it, smallest first.
        #[arg(long)]
        at: Option<String>,
    },
    /// Plan a trajectory through a scenario without executing it.
    Plan {
        #[arg(long)]
        scenario: PathBuf,
        /// Start point as "X,Y".
        #[arg(long)]
        from: String,
        /// Target zone id.
        #[arg(long)]
        target: String,
        /// direct, safe, or sweep.
        #[arg(long, default_value = "safe")]
        mode: String,
        /// Zone ids to route around (repeatable).
        #[arg(long)]
        avoid: Vec<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a task against a scenario.
    Run {
        #[arg(long)]
        scenario: PathBuf,
        /// Execute this plan file instead of calling the planner command.
        #[arg(long)]
        plan: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Natural-language task description.
        #[arg(long)]
        task: String,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Check { scenario, plan } => cmd_check(&scenario, plan.as_deref()),
        Command::Zones { scenario, at } => cmd_zones(&scenario, at.as_deref()),
        Command::Plan {
            scenario,
            from,
            target,
            mode,
            avoid,
            config,
        } => cmd_plan(&scenario, &from, &target, &mode, &avoid, config.as_deref()),
        Command::Run {
            scenario,
            plan,
            config,
            task,
        } => cmd_run(&scenario, plan.as_deref(), config.as_deref(), &task),
    }
}

fn cmd_check(scenario_path: &Path, plan_path: Option<&Path>) -> Result<i32> {
    let scenario = load_scenario(scenario_path)?;
    println!("scenario ok: {} zones", scenario.zones.len());
    if let Some(path) = plan_path {
        let steps = load_plan(path)?;
        println!("plan ok: {} steps", steps.len());
    }
    Ok(exit_codes::OK)
}

fn cmd_zones(scenario_path: &Path, at: Option<&str>) -> Result<i32> {
    let scenario = load_scenario(scenario_path)?;
    let registry = ZoneRegistry::default();
    apply_scenario(&scenario, &registry)?;
    let zones = match at {
        Some(raw) => registry.find_at_point(parse_point(raw)?),
        None => registry.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&zones)?);
    Ok(exit_codes::OK)
}

fn cmd_plan(
    scenario_path: &Path,
    from: &str,
    target: &str,
    mode: &str,
    avoid: &[String],
    config_path: Option<&Path>,
) -> Result<i32> {
    let cfg = load_config_opt(config_path)?;
    let scenario = load_scenario(scenario_path)?;
    let registry = Arc::new(ZoneRegistry::default());
    apply_scenario(&scenario, &registry)?;

    let planner = MotionPlanner::new(Arc::clone(&registry), cfg.motion_config());
    let start = parse_point(from)?;
    let trajectory = match mode {
        "direct" => planner.plan_direct(start, target)?,
        "safe" => planner.plan_safe(start, target, avoid)?,
        "sweep" => {
            let Some(zone) = registry.get(target) else {
                bail!("zone not found: {target}");
            };
            let mut trajectory = planner.plan_exploratory(start, zone.bounds);
            trajectory.target_zone_id = target.to_string();
            trajectory
        }
        other => bail!("unknown mode: {other} (expected direct, safe, or sweep)"),
    };

    let payload = serde_json::json!({
        "trajectory": trajectory,
        "estimated_duration_ms": planner.estimate_duration_ms(&trajectory),
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(exit_codes::OK)
}

fn cmd_run(
    scenario_path: &Path,
    plan_path: Option<&Path>,
    config_path: Option<&Path>,
    task: &str,
) -> Result<i32> {
    let cfg = load_config_opt(config_path)?;
    let scenario = load_scenario(scenario_path)?;

    let driver = Arc::new(SimulatedDriver::new(
        scenario.screen.width,
        scenario.screen.height,
    ));
    driver.set_cursor(scenario.cursor);
    let registry = Arc::new(ZoneRegistry::default());
    apply_scenario(&scenario, &registry)?;

    let steps = StepExecutor::new(
        Arc::clone(&driver),
        Arc::clone(&registry),
        cfg.brush_config(),
        cfg.tracker_config(),
        cfg.motion_config(),
    );
    let perception = ScenarioPerception::new(Arc::clone(&registry), scenario_path);

    match plan_path {
        Some(path) => run_task(steps, FilePlanner::new(path), perception, registry, &cfg, task),
        None => {
            let planner = CliPlanner::new(
                cfg.planner.command.clone(),
                Duration::from_secs(cfg.planner.timeout_secs),
                cfg.planner.output_limit_bytes,
                cfg.planner.prompt_budget_bytes,
            )
            .context("planner.command must be configured when no plan file is given")?;
            run_task(steps, planner, perception, registry, &cfg, task)
        }
    }
}

fn run_task<P: TaskPlanner>(
    steps: StepExecutor<SimulatedDriver>,
    planner: P,
    perception: ScenarioPerception,
    registry: Arc<ZoneRegistry>,
    cfg: &BrushworkConfig,
    task: &str,
) -> Result<i32> {
    let mut director = Director::new(steps, planner, perception, registry, cfg.director_config());
    let result = director.execute_task(task);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(match result.outcome {
        TaskOutcome::Completed => exit_codes::OK,
        TaskOutcome::Failed => exit_codes::TASK_FAILED,
        TaskOutcome::BudgetExceeded => exit_codes::BUDGET_EXCEEDED,
    })
}

fn load_config_opt(path: Option<&Path>) -> Result<BrushworkConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            load_config(path)
        }
        None => Ok(BrushworkConfig::default()),
    }
}

/// Parse "X,Y" into a point.
fn parse_point(raw: &str) -> Result<Point> {
    let Some((x, y)) = raw.split_once(',') else {
        bail!("expected \"X,Y\", got {raw:?}");
    };
    let x = x
        .trim()
        .parse::<i32>()
        .with_context(|| format!("parse x in {raw:?}"))?;
    let y = y
        .trim()
        .parse::<i32>()
        .with_context(|| format!("parse y in {raw:?}"))?;
    Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_plan() {
        let cli = Cli::parse_from([
            "brushwork",
            "run",
            "--scenario",
            "demo.json",
            "--plan",
            "plan.json",
            "--task",
            "open the menu",
        ]);
        assert!(matches!(
            cli.command,
            Command::Run { plan: Some(_), .. }
        ));
    }

    #[test]
    fn parse_plan_defaults_to_safe_mode() {
        let cli = Cli::parse_from([
            "brushwork",
            "plan",
            "--scenario",
            "demo.json",
            "--from",
            "0,0",
            "--target",
            "btn",
        ]);
        let Command::Plan { mode, avoid, .. } = cli.command else {
            panic!("expected plan command");
        };
        assert_eq!(mode, "safe");
        assert!(avoid.is_empty());
    }

    #[test]
    fn parse_point_accepts_spaces() {
        assert_eq!(parse_point("10, 20").expect("parse"), Point::new(10, 20));
        assert_eq!(parse_point("-5,0").expect("parse"), Point::new(-5, 0));
    }

    #[test]
    fn parse_point_rejects_garbage() {
        assert!(parse_point("10").is_err());
        assert!(parse_point("a,b").is_err());
    }
}
