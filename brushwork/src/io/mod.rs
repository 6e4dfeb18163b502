//! Side-effecting boundaries: the platform driver, external planner and
//! perception processes, and file-backed configuration and scenarios.
//!
//! Everything that touches a screen, a process, or a disk lives here, behind
//! traits where the control layers need substitution in tests.

pub mod config;
pub mod perception;
pub mod planner;
pub mod platform;
pub mod process;
pub mod prompt;
pub mod scenario;
