//! Market-launch proposal payloads.

use crate::error::GovernanceError;
use rmr_types::{normalize, validate, HarnessConfig};
use serde::{Deserialize, Serialize};

/// Type URL of the exchange module's instant perpetual launch message.
pub const MSG_INSTANT_PERPETUAL_MARKET_LAUNCH: &str =
    "/injective.exchange.v1beta1.MsgInstantPerpetualMarketLaunch";

/// Launch parameters other than the ratios.
#[derive(Clone, Debug)]
pub struct MarketOptions {
    pub sender: String,
    /// Defaults to the base denom when `None`.
    pub oracle_base: Option<String>,
    /// Defaults to the quote denom when `None`.
    pub oracle_quote: Option<String>,
    pub oracle_scale_factor: u32,
    pub oracle_type: String,
    pub maker_fee_rate: String,
    pub taker_fee_rate: String,
    pub min_price_tick_size: String,
    pub min_quantity_tick_size: String,
    pub metadata: String,
    pub deposit: String,
}

impl Default for MarketOptions {
    fn default() -> Self {
        Self {
            sender: "inj1...".to_string(),
            oracle_base: None,
            oracle_quote: None,
            oracle_scale_factor: 6,
            oracle_type: "Band".to_string(),
            maker_fee_rate: "0.001".to_string(),
            taker_fee_rate: "0.002".to_string(),
            min_price_tick_size: "0.000001".to_string(),
            min_quantity_tick_size: "0.001".to_string(),
            metadata: "ipfs://CID".to_string(),
            // 1 INJ
            deposit: "1000000000000000000inj".to_string(),
        }
    }
}

/// `MsgInstantPerpetualMarketLaunch` as it appears in the proposal file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketLaunchMessage {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub sender: String,
    pub ticker: String,
    pub base_denom: String,
    pub quote_denom: String,
    pub oracle_base: String,
    pub oracle_quote: String,
    pub oracle_scale_factor: u32,
    pub oracle_type: String,
    pub maker_fee_rate: String,
    pub taker_fee_rate: String,
    pub initial_margin_ratio: String,
    pub maintenance_margin_ratio: String,
    pub reduce_margin_ratio: String,
    pub min_price_tick_size: String,
    pub min_quantity_tick_size: String,
}

/// The JSON document handed to `tx gov submit-proposal`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub messages: Vec<MarketLaunchMessage>,
    pub metadata: String,
    pub deposit: String,
    pub title: String,
    pub summary: String,
}

impl ProposalPayload {
    /// The launch message. Built payloads always carry exactly one.
    pub fn launch(&self) -> Option<&MarketLaunchMessage> {
        self.messages.first()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Assembles launch proposals, filling omitted IMR/MMR from configuration.
pub struct ProposalBuilder {
    default_imr: f64,
    default_mmr: f64,
}

impl ProposalBuilder {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            default_imr: config.default_imr,
            default_mmr: config.default_mmr,
        }
    }

    /// Build a launch proposal for `ticker`.
    ///
    /// Fails with [`GovernanceError::ConstraintViolation`] when the ratios
    /// break `RMR >= IMR > MMR`, and with [`GovernanceError::Ratio`] when a
    /// ratio that passed the comparison has no decimal form (infinity).
    pub fn build(
        &self,
        ticker: &str,
        base_denom: &str,
        quote_denom: &str,
        rmr: f64,
        imr: Option<f64>,
        mmr: Option<f64>,
        options: &MarketOptions,
    ) -> Result<ProposalPayload, GovernanceError> {
        let imr = imr.unwrap_or(self.default_imr);
        let mmr = mmr.unwrap_or(self.default_mmr);

        if !validate(rmr, imr, mmr) {
            return Err(GovernanceError::ConstraintViolation { rmr, imr, mmr });
        }

        let rmr_str = normalize(rmr)?;
        let imr_str = normalize(imr)?;
        let mmr_str = normalize(mmr)?;

        let message = MarketLaunchMessage {
            type_url: MSG_INSTANT_PERPETUAL_MARKET_LAUNCH.to_string(),
            sender: options.sender.clone(),
            ticker: ticker.to_string(),
            base_denom: base_denom.to_string(),
            quote_denom: quote_denom.to_string(),
            oracle_base: options
                .oracle_base
                .clone()
                .unwrap_or_else(|| base_denom.to_string()),
            oracle_quote: options
                .oracle_quote
                .clone()
                .unwrap_or_else(|| quote_denom.to_string()),
            oracle_scale_factor: options.oracle_scale_factor,
            oracle_type: options.oracle_type.clone(),
            maker_fee_rate: options.maker_fee_rate.clone(),
            taker_fee_rate: options.taker_fee_rate.clone(),
            initial_margin_ratio: imr_str,
            maintenance_margin_ratio: mmr_str,
            reduce_margin_ratio: rmr_str.clone(),
            min_price_tick_size: options.min_price_tick_size.clone(),
            min_quantity_tick_size: options.min_quantity_tick_size.clone(),
        };

        Ok(ProposalPayload {
            messages: vec![message],
            metadata: options.metadata.clone(),
            deposit: options.deposit.clone(),
            title: format!("Launch {ticker} Perpetual Market with RMR"),
            summary: format!("Proposal to launch {ticker} perpetual market with RMR={rmr_str}"),
        })
    }
}
