use rmr_executor::ExecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market query failed: {0}")]
    Execution(#[from] ExecError),

    #[error("malformed market response: {0}")]
    Malformed(String),
}
