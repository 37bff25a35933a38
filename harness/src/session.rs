//! A connected test session and the fixtures scenarios start from.

use crate::error::HarnessError;
use rmr_executor::{ChainCli, CommandRunner};
use rmr_governance::{LifecycleDriver, MarketOptions, ProposalBuilder, ProposalId};
use rmr_markets::MarketReconciler;
use rmr_types::HarnessConfig;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;
use tracing::{info, warn};

const BASE_DENOM: &str = "tst";
const QUOTE_DENOM: &str = "usdt";

/// Named RMR values used across scenarios.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RmrScenario {
    ValidHigh,
    ValidMedium,
    ValidLow,
    InvalidLow,
    Boundary,
}

impl RmrScenario {
    pub const ALL: [RmrScenario; 5] = [
        RmrScenario::ValidHigh,
        RmrScenario::ValidMedium,
        RmrScenario::ValidLow,
        RmrScenario::InvalidLow,
        RmrScenario::Boundary,
    ];

    pub fn rmr(self) -> f64 {
        match self {
            RmrScenario::ValidHigh => 0.15,
            RmrScenario::ValidMedium => 0.10,
            RmrScenario::ValidLow => 0.05,
            RmrScenario::InvalidLow => 0.02,
            RmrScenario::Boundary => 0.035,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RmrScenario::ValidHigh => "valid_high",
            RmrScenario::ValidMedium => "valid_medium",
            RmrScenario::ValidLow => "valid_low",
            RmrScenario::InvalidLow => "invalid_low",
            RmrScenario::Boundary => "boundary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for RmrScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.rmr())
    }
}

/// A market created through a passed launch proposal.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchedMarket {
    pub market_id: String,
    pub ticker: String,
    pub rmr: f64,
    pub proposal_id: ProposalId,
}

/// `TEST<unix-secs><8 hex>/USDT PERP`; the hex comes from a random v4 uuid.
pub fn unique_ticker() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let id = Uuid::new_v4().simple().to_string();
    format!("TEST{secs}{}/USDT PERP", &id[..8])
}

/// Configuration plus a node handle; the components borrow from it.
pub struct Session {
    config: HarnessConfig,
    cli: ChainCli,
}

impl Session {
    pub fn new(runner: Arc<dyn CommandRunner>, config: HarnessConfig) -> Self {
        let cli = ChainCli::with_runner(runner, &config);
        Self { config, cli }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn cli(&self) -> &ChainCli {
        &self.cli
    }

    pub fn builder(&self) -> ProposalBuilder {
        ProposalBuilder::new(&self.config)
    }

    pub fn driver(&self) -> LifecycleDriver<'_> {
        LifecycleDriver::new(&self.cli, &self.config)
    }

    pub fn reconciler(&self) -> MarketReconciler<'_> {
        MarketReconciler::new(&self.cli, &self.config)
    }

    /// Current block height; the node must be past genesis.
    pub async fn check_node(&self) -> Result<u64, HarnessError> {
        let height = self.cli.query_block_height().await?;
        if height == 0 {
            return Err(HarnessError::NodeNotProducing);
        }
        info!(height, "node is producing blocks");
        Ok(height)
    }

    /// Addresses of the candidate, validator and admin keys.
    pub async fn check_keys(&self) -> Result<BTreeMap<String, String>, HarnessError> {
        let mut addresses = BTreeMap::new();
        for name in [
            &self.config.testcandidate_key,
            &self.config.validator_key,
            &self.config.admin_key,
        ] {
            if addresses.contains_key(name.as_str()) {
                continue;
            }
            let response = self
                .cli
                .keys_show(name)
                .await
                .map_err(|e| HarnessError::MissingKey {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let address = address_of(&response).ok_or_else(|| HarnessError::MissingKey {
                name: name.clone(),
                reason: format!("no address in {response}"),
            })?;
            info!(key = %name, %address, "key available");
            addresses.insert(name.clone(), address);
        }
        Ok(addresses)
    }

    /// Launch a market with the given RMR through governance and look it up.
    ///
    /// Omitted IMR/MMR fall back to the configured defaults.
    pub async fn launch_market(
        &self,
        ticker: &str,
        rmr: f64,
        imr: Option<f64>,
        mmr: Option<f64>,
    ) -> Result<LaunchedMarket, HarnessError> {
        let payload = self.builder().build(
            ticker,
            BASE_DENOM,
            QUOTE_DENOM,
            rmr,
            imr,
            mmr,
            &MarketOptions::default(),
        )?;

        let proposal_id = self
            .driver()
            .run_to_completion(
                &payload,
                &self.config.admin_key,
                &self.config.validator_key,
                self.config.proposal_timeout(),
            )
            .await?;

        tokio::time::sleep(self.config.market_creation_delay()).await;

        let Some(market) = self.reconciler().find_by_ticker(ticker).await? else {
            warn!(ticker, %proposal_id, "launch passed but market is missing");
            return Err(HarnessError::MarketNotFound {
                ticker: ticker.to_string(),
            });
        };

        info!(ticker, market_id = %market.market_id, rmr, "market launched");
        Ok(LaunchedMarket {
            market_id: market.market_id,
            ticker: ticker.to_string(),
            rmr,
            proposal_id,
        })
    }
}

/// `keys show --address` prints a bare address, which the executor wraps.
fn address_of(response: &Value) -> Option<String> {
    response
        .get("address")
        .or_else(|| response.get("output"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
