#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stockdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the stockdata market-data facade.
//!
//! This crate provides the foundational abstractions shared by the cache,
//! the provider implementations and the HTTP surface:
//!
//! - [`TickerHandle`](provider::TickerHandle) - Upstream session for one symbol
//! - [`HandleFactory`](provider::HandleFactory) - Lazily builds handles
//! - [`Clock`](clock::Clock) - Time source used for expiry decisions
//! - [`HistoryPeriod`](period::HistoryPeriod) - Supported lookback windows

/// Time source abstraction.
pub mod clock;
/// Error types for market-data operations.
pub mod error;
/// Polars frame conversions for price and dividend series.
pub mod frame;
/// History period definitions.
pub mod period;
/// Collaborator traits for the upstream provider.
pub mod provider;
/// Core data types (Symbol, HistoricalPrice, BasicInfo, etc.).
pub mod types;

/// Test doubles for the collaborator traits.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used items at crate root
pub use clock::{Clock, SystemClock};
pub use error::{DataError, Result};
pub use period::HistoryPeriod;
pub use provider::{HandleFactory, TickerHandle};
pub use types::{
    BasicInfo, Dividend, EarningsDate, HistoricalPrice, InfoSnapshot, PriceBar, Symbol,
};
