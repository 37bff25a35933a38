//! Test-session plumbing on top of the governance and market crates.
//!
//! A [`Session`] owns the configuration and the node CLI handle and hands
//! out the per-stage components. [`ExecutionReport`] records scenario steps
//! and appends them to a markdown log.

pub mod error;
pub mod report;
pub mod session;

pub use error::HarnessError;
pub use report::{ExecutionReport, StepResult};
pub use session::{unique_ticker, LaunchedMarket, RmrScenario, Session};
