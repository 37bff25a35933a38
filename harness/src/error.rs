use rmr_executor::ExecError;
use rmr_governance::GovernanceError;
use rmr_markets::MarketError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("market error: {0}")]
    Market(#[from] MarketError),

    #[error("node CLI error: {0}")]
    Execution(#[from] ExecError),

    #[error("node is not producing blocks (height 0)")]
    NodeNotProducing,

    #[error("key {name} is not available: {reason}")]
    MissingKey { name: String, reason: String },

    #[error("no market with ticker {ticker} after the launch proposal passed")]
    MarketNotFound { ticker: String },

    #[error("failed to write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
}
