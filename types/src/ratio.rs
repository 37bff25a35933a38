//! Margin ratios and their on-chain decimal form.
//!
//! The exchange stores every ratio as a decimal string with exactly
//! [`STORED_DECIMALS`] fractional digits, truncated rather than rounded.
//! Conversion never scales the binary `f64`: it starts from the shortest
//! decimal string that round-trips to the same `f64` and truncates digits,
//! so `0.1` becomes `"0.100000"` and not `"0.099999"`.

use crate::error::RatioError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits in a stored ratio.
pub const STORED_DECIMALS: usize = 6;

/// Check the margin ordering `RMR >= IMR > MMR`.
///
/// Plain float comparison with no tolerance band: `rmr == imr` passes,
/// `imr == mmr` does not. Infinities and negative values are compared like
/// any other real; NaN fails both comparisons.
pub fn validate(rmr: f64, imr: f64, mmr: f64) -> bool {
    rmr >= imr && imr > mmr
}

/// Render a ratio the way the chain stores it.
///
/// ```
/// assert_eq!(rmr_types::normalize(0.1).unwrap(), "0.100000");
/// assert_eq!(rmr_types::normalize(0.0512345678).unwrap(), "0.051234");
/// ```
pub fn normalize(value: f64) -> Result<String, RatioError> {
    if !value.is_finite() {
        return Err(RatioError::NonFinite(value));
    }

    // `Display` for f64 yields the shortest round-trip decimal and never
    // switches to exponent notation.
    let repr = value.to_string();
    let (negative, magnitude) = match repr.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, repr.as_str()),
    };
    let (int_part, frac_part) = magnitude.split_once('.').unwrap_or((magnitude, ""));

    let mut frac: String = frac_part.chars().take(STORED_DECIMALS).collect();
    while frac.len() < STORED_DECIMALS {
        frac.push('0');
    }

    let all_zero = int_part.bytes().all(|b| b == b'0') && frac.bytes().all(|b| b == b'0');
    let sign = if negative && !all_zero { "-" } else { "" };
    Ok(format!("{sign}{int_part}.{frac}"))
}

/// Parse a stored decimal string back into a ratio.
pub fn parse_stored(stored: &str) -> Result<f64, RatioError> {
    stored
        .trim()
        .parse::<f64>()
        .map_err(|_| RatioError::Unparseable(stored.to_string()))
}

/// A reduce/initial/maintenance margin triple.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarginRatios {
    pub rmr: f64,
    pub imr: f64,
    pub mmr: f64,
}

impl MarginRatios {
    pub fn new(rmr: f64, imr: f64, mmr: f64) -> Self {
        Self { rmr, imr, mmr }
    }

    pub fn is_valid(&self) -> bool {
        validate(self.rmr, self.imr, self.mmr)
    }
}

impl fmt::Display for MarginRatios {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RMR={} IMR={} MMR={}", self.rmr, self.imr, self.mmr)
    }
}
