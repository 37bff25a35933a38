//! Reading and adjusting perpetual markets once they exist on chain.
//!
//! Lookups report transport problems as [`MarketError`]; `verify_value` and
//! `update` collapse every failure into `false` so scenario code can assert
//! on a single boolean.

pub mod error;
pub mod market;
pub mod reconciler;

pub use error::MarketError;
pub use market::Market;
pub use reconciler::{MarketReconciler, DEFAULT_TOLERANCE};
