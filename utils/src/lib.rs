//! Shared utilities for the RMR harness.

pub mod logging;
pub mod time;

pub use logging::init_tracing;
pub use time::{format_duration, format_duration_precise};
