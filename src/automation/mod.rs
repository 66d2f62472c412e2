//! The detection-and-click loop.
//!
//! This module provides:
//! - Loop configuration (`config`)
//! - Scheduler states, counters, and the cancellation token (`state`)
//! - The polling scheduler itself (`scheduler`)

pub mod config;
pub mod scheduler;
pub mod state;

pub use config::Config;
pub use scheduler::Scheduler;
pub use state::{CancelToken, LoopState, SchedulerState};
