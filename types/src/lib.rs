//! Fundamental types for the RMR harness.
//!
//! This crate defines what every other crate in the workspace shares: the
//! margin-ratio ordering check, the fixed-precision decimal form ratios are
//! stored in on chain, and the harness configuration.

pub mod config;
pub mod error;
pub mod ratio;

pub use config::HarnessConfig;
pub use error::{ConfigError, RatioError};
pub use ratio::{normalize, parse_stored, validate, MarginRatios, STORED_DECIMALS};
