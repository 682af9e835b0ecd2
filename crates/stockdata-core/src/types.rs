//! Core data types for the market-data facade.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Ticker symbol, used verbatim as the cache key
//! - [`PriceBar`] - One daily OHLCV row as delivered by the provider
//! - [`HistoricalPrice`] - One trading day in the public history contract
//! - [`Dividend`] - One dividend payment
//! - [`BasicInfo`] - Quote and fundamentals snapshot
//! - [`EarningsDate`] - Next earnings date, or the provider's raw value
//! - [`InfoSnapshot`] - Raw provider field map behind [`BasicInfo`]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ticker symbol.
///
/// Symbols are kept exactly as given. `aapl` and `AAPL` are distinct keys for
/// both the handle cache and the upstream provider, so callers that want
/// case-insensitive lookups must normalize before constructing one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string without altering it.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Daily OHLCV row as delivered by the upstream provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading day.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price during the day.
    pub high: f64,
    /// Lowest price during the day.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: u64,
}

impl PriceBar {
    /// Creates a new price bar.
    #[must_use]
    pub const fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// One trading day of the public history contract.
///
/// Field order matches the JSON contract: `date, open, close, low, high,
/// volume, dividend`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPrice {
    /// Trading day, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Closing price.
    pub close: f64,
    /// Lowest price.
    pub low: f64,
    /// Highest price.
    pub high: f64,
    /// Traded volume.
    pub volume: u64,
    /// Dividend paid on this date, `0.0` if none.
    pub dividend: f64,
}

impl HistoricalPrice {
    /// Combines a provider bar with the dividend paid on the same day.
    #[must_use]
    pub const fn from_bar(bar: &PriceBar, dividend: f64) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            close: bar.close,
            low: bar.low,
            high: bar.high,
            volume: bar.volume,
            dividend,
        }
    }
}

/// A single dividend payment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    /// Ex-dividend date.
    pub date: NaiveDate,
    /// Amount paid per share.
    pub amount: f64,
}

impl Dividend {
    /// Creates a new dividend.
    #[must_use]
    pub const fn new(date: NaiveDate, amount: f64) -> Self {
        Self { date, amount }
    }
}

/// Next earnings date as reported by the provider.
///
/// Epoch timestamps are converted to calendar dates. A value that cannot be
/// converted is kept as the provider's raw value rendered as a string. Both
/// forms serialize as a plain JSON string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EarningsDate {
    /// A converted calendar date.
    Date(NaiveDate),
    /// The unconverted provider value.
    Raw(String),
}

/// Raw quote and fundamentals fields keyed by the provider's field names.
pub type InfoSnapshot = serde_json::Map<String, serde_json::Value>;

/// Flat quote and fundamentals snapshot for one symbol.
///
/// Every field the provider does not supply is `None` and serializes as
/// `null`; keys are never omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    /// Company name.
    pub name: Option<String>,
    /// Current price.
    pub price: Option<f64>,
    /// Forward price-to-earnings ratio.
    pub pe_ratio: Option<f64>,
    /// Price-to-book ratio.
    pub pb_ratio: Option<f64>,
    /// Trailing earnings per share.
    pub eps: Option<f64>,
    /// Return on equity.
    pub roe: Option<f64>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Analyst consensus (e.g. `"buy"`).
    pub recommendation: Option<String>,
    /// Number of analyst opinions behind the consensus.
    pub analyst_count: Option<u64>,
    /// 52-week high price.
    pub fifty_two_week_high: Option<f64>,
    /// 52-week low price.
    pub fifty_two_week_low: Option<f64>,
    /// Beta coefficient.
    pub beta: Option<f64>,
    /// Business sector.
    pub sector: Option<String>,
    /// Industry within the sector.
    pub industry: Option<String>,
    /// Next earnings date.
    pub earnings_date: Option<EarningsDate>,
    /// Forward annual dividend rate.
    pub dividend_rate: Option<f64>,
    /// Trailing annual dividend rate.
    pub trailing_annual_dividend_rate: Option<f64>,
}
