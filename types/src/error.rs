//! Error types shared across crates.

use thiserror::Error;

/// Failures converting between `f64` ratios and stored decimal strings.
#[derive(Debug, Error)]
pub enum RatioError {
    #[error("ratio {0} is not finite and has no decimal form")]
    NonFinite(f64),

    #[error("stored ratio {0:?} is not a decimal number")]
    Unparseable(String),
}

/// Failures loading a [`HarnessConfig`](crate::HarnessConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config: {0}")]
    Parse(String),
}
