//! GUI-automation agent control core.
//!
//! This crate drives a cursor ("brush") across a screen of interactive
//! regions ("zones"): it plans collision-aware trajectories, walks them
//! waypoint by waypoint while emitting spatial events, verifies arrival
//! before acting, and recovers from failures under hard budgets. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (geometry, routing,
//!   classification, event types). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (input drivers, process
//!   execution, scenario files, planner backends). Isolated behind
//!   traits to enable scripted doubles in tests.
//!
//! Orchestration modules ([`registry`], [`tracker`], [`motion`],
//! [`executor`], [`brush`], [`step`], [`director`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod brush;
pub mod core;
pub mod director;
pub mod executor;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod motion;
pub mod registry;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tracker;
