//! Market lookup and RMR reconciliation against chain state.

use crate::error::MarketError;
use crate::market::{entries, ticker_of, Market};
use rmr_executor::{tx_code, ChainCli};
use rmr_types::{normalize, HarnessConfig};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tolerance for comparing a stored ratio with the value that was written.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

pub struct MarketReconciler<'a> {
    cli: &'a ChainCli,
    admin_key: String,
    block_time: Duration,
    update_settle_blocks: u64,
}

impl<'a> MarketReconciler<'a> {
    pub fn new(cli: &'a ChainCli, config: &HarnessConfig) -> Self {
        Self {
            cli,
            admin_key: config.admin_key.clone(),
            block_time: config.block_time(),
            update_settle_blocks: config.update_settle_blocks,
        }
    }

    /// First market whose ticker equals `ticker`.
    pub async fn find_by_ticker(&self, ticker: &str) -> Result<Option<Market>, MarketError> {
        let response = self.cli.query_all_markets().await?;
        let Some(entry) = entries(&response)?
            .iter()
            .find(|entry| ticker_of(entry) == Some(ticker))
        else {
            return Ok(None);
        };
        let market = Market::from_entry(entry)?;
        debug!(ticker, market_id = %market.market_id, "market found");
        Ok(Some(market))
    }

    /// Fetch a single market. `None` when the node reports no such market.
    pub async fn market(&self, market_id: &str) -> Result<Option<Market>, MarketError> {
        let response = self.cli.query_market(market_id).await?;
        match response.get("market") {
            Some(Value::Null) => Ok(None),
            Some(_) => Market::from_entry(&response).map(Some),
            None if response.get("market_id").is_some() => Market::from_entry(&response).map(Some),
            None => Ok(None),
        }
    }

    /// Stored reduce margin ratio. `None` when the market or field is absent.
    pub async fn stored_rmr(&self, market_id: &str) -> Result<Option<f64>, MarketError> {
        let Some(market) = self.market(market_id).await? else {
            return Ok(None);
        };
        match market.rmr() {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => Err(MarketError::Malformed(e.to_string())),
        }
    }

    /// True iff the stored RMR is within `tolerance` of `expected`.
    ///
    /// Any lookup failure or missing value counts as a mismatch.
    pub async fn verify_value(&self, market_id: &str, expected: f64, tolerance: f64) -> bool {
        match self.stored_rmr(market_id).await {
            Ok(Some(actual)) => {
                let matches = (actual - expected).abs() <= tolerance;
                if !matches {
                    warn!(market_id, actual, expected, tolerance, "stored rmr differs");
                }
                matches
            }
            Ok(None) => {
                warn!(market_id, "market or reduce_margin_ratio not found");
                false
            }
            Err(e) => {
                error!(market_id, error = %e, "failed to read stored rmr");
                false
            }
        }
    }

    pub async fn verify_value_default(&self, market_id: &str, expected: f64) -> bool {
        self.verify_value(market_id, expected, DEFAULT_TOLERANCE).await
    }

    /// Set the market's RMR through the admin path and confirm it landed.
    ///
    /// Never fails; every problem is logged and reported as `false`.
    pub async fn update(&self, market_id: &str, new_value: f64) -> bool {
        let stored = match normalize(new_value) {
            Ok(stored) => stored,
            Err(e) => {
                error!(market_id, error = %e, "cannot normalize new rmr");
                return false;
            }
        };

        let response = match self
            .cli
            .admin_update_market(market_id, &stored, &self.admin_key)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(market_id, error = %e, "admin update failed");
                return false;
            }
        };

        let code = tx_code(&response);
        if code != 0 {
            let raw_log = response.get("raw_log").and_then(Value::as_str).unwrap_or_default();
            error!(market_id, code, raw_log, "admin update rejected");
            return false;
        }

        info!(market_id, rmr = %stored, "admin update accepted");
        self.wait_for_blocks(self.update_settle_blocks).await;
        self.verify_value(market_id, new_value, DEFAULT_TOLERANCE).await
    }

    /// Sleep for roughly `blocks` block times.
    pub async fn wait_for_blocks(&self, blocks: u64) {
        let blocks = u32::try_from(blocks).unwrap_or(u32::MAX);
        tokio::time::sleep(self.block_time.saturating_mul(blocks)).await;
    }
}
