//! A perpetual market as returned by the exchange queries.

use crate::error::MarketError;
use rmr_types::{parse_stored, RatioError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of market fields the harness reads.
///
/// Ratios stay in their stored string form; absent fields are `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Market {
    #[serde(default)]
    pub market_id: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub reduce_margin_ratio: Option<String>,
    #[serde(default)]
    pub initial_margin_ratio: Option<String>,
    #[serde(default)]
    pub maintenance_margin_ratio: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Market {
    /// Decode one entry, either `{ "market": {...} }` or the market itself.
    pub fn from_entry(entry: &Value) -> Result<Self, MarketError> {
        let inner = entry.get("market").unwrap_or(entry);
        if !inner.is_object() {
            return Err(MarketError::Malformed(format!("expected market object, got {inner}")));
        }
        serde_json::from_value(inner.clone()).map_err(|e| MarketError::Malformed(e.to_string()))
    }

    /// Stored RMR as a number. `None` when the field is absent.
    pub fn rmr(&self) -> Option<Result<f64, RatioError>> {
        self.reduce_margin_ratio.as_deref().map(parse_stored)
    }
}

/// Ticker of a raw entry, wrapped or flat, without decoding the rest.
pub(crate) fn ticker_of(entry: &Value) -> Option<&str> {
    entry.get("market").unwrap_or(entry).get("ticker")?.as_str()
}

/// Market entries of a `perpetual-markets` response. A missing list is empty.
pub fn entries(response: &Value) -> Result<&[Value], MarketError> {
    match response.get("markets") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(MarketError::Malformed(format!("markets is not a list: {other}"))),
    }
}
