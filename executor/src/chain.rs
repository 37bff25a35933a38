//! Subcommands of the node CLI used by the harness.

use crate::error::ExecError;
use crate::executor::CommandExecutor;
use crate::runner::CommandRunner;
use rmr_types::HarnessConfig;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Ballot choice for `tx gov vote`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
    NoWithVeto,
}

impl VoteOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteOption::Yes => "yes",
            VoteOption::No => "no",
            VoteOption::Abstain => "abstain",
            VoteOption::NoWithVeto => "no_with_veto",
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed wrappers around the node's query and tx subcommands.
pub struct ChainCli {
    executor: CommandExecutor,
}

impl ChainCli {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>, config: &HarnessConfig) -> Self {
        Self::new(CommandExecutor::new(runner, config))
    }

    async fn run(&self, parts: &[&str]) -> Result<Value, ExecError> {
        let args: Vec<String> = parts.iter().map(|s| s.to_string()).collect();
        self.executor.execute(&args).await
    }

    /// Current block height, 0 if the response carries none.
    pub async fn query_block_height(&self) -> Result<u64, ExecError> {
        let block = self.run(&["query", "block"]).await?;
        let height = block
            .pointer("/block/header/height")
            .or_else(|| block.pointer("/header/height"));
        Ok(height.map(as_u64_lenient).unwrap_or(0))
    }

    pub async fn query_proposal(&self, proposal_id: &str) -> Result<Value, ExecError> {
        self.run(&["query", "gov", "proposal", proposal_id]).await
    }

    pub async fn query_all_markets(&self) -> Result<Value, ExecError> {
        self.run(&["query", "exchange", "perpetual-markets"]).await
    }

    pub async fn query_market(&self, market_id: &str) -> Result<Value, ExecError> {
        self.run(&["query", "exchange", "perpetual-market-info", market_id])
            .await
    }

    pub async fn submit_proposal(&self, proposal_file: &Path, from_key: &str) -> Result<Value, ExecError> {
        let path = proposal_file.to_string_lossy().into_owned();
        self.run(&["tx", "gov", "submit-proposal", path.as_str(), "--from", from_key])
            .await
    }

    pub async fn vote(
        &self,
        proposal_id: &str,
        option: VoteOption,
        from_key: &str,
    ) -> Result<Value, ExecError> {
        self.run(&["tx", "gov", "vote", proposal_id, option.as_str(), "--from", from_key])
            .await
    }

    /// Admin-only direct update of a market's reduce margin ratio.
    ///
    /// `rmr` must already be in stored decimal form.
    pub async fn admin_update_market(
        &self,
        market_id: &str,
        rmr: &str,
        from_key: &str,
    ) -> Result<Value, ExecError> {
        self.run(&[
            "tx",
            "exchange",
            "admin-update-perpetual-market",
            market_id,
            "--reduce-margin-ratio",
            rmr,
            "--from",
            from_key,
        ])
        .await
    }

    pub async fn keys_show(&self, key_name: &str) -> Result<Value, ExecError> {
        self.run(&["keys", "show", key_name, "--address"]).await
    }
}

/// Reported for a `code` that is present but not a non-negative integer.
pub const UNREADABLE_CODE: u64 = u64::MAX;

/// Status code of a tx response. A response without one counts as success;
/// a code that cannot be read never does.
pub fn tx_code(response: &Value) -> u64 {
    match response.get("code") {
        None | Some(Value::Null) => 0,
        Some(code) => as_u64_strict(code).unwrap_or(UNREADABLE_CODE),
    }
}

/// Cosmos CLIs print integers either as JSON numbers or as strings.
fn as_u64_strict(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64_lenient(value: &Value) -> u64 {
    as_u64_strict(value).unwrap_or(0)
}
