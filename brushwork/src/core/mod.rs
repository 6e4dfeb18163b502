//! Pure, deterministic control-core logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures, never read clocks, and return deterministic outputs
//! suitable for tests.

pub mod action;
pub mod classifier;
pub mod event;
pub mod geometry;
pub mod route;
pub mod timestamp;
pub mod trajectory;
pub mod zone;
