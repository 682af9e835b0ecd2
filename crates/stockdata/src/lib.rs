#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stockdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Market-data fetchers for ticker symbols.
//!
//! This crate re-exports the core types, the handle cache and the provider
//! implementation, and provides [`MarketData`] for the three read operations.
//!
//! # Features
//!
//! - `yahoo` - Yahoo Finance handle factory (enabled by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockdata::{MarketData, Symbol, TickerCache, YahooFactory};
//!
//! #[tokio::main]
//! async fn main() -> stockdata::Result<()> {
//!     let cache = Arc::new(TickerCache::new(Arc::new(YahooFactory::new()?)));
//!     let market = MarketData::new(cache);
//!
//!     let info = market.fetch_basic_info(&Symbol::new("AAPL")).await?;
//!     println!("{:?}", info);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use stockdata_core::*;

// Handle cache
pub use stockdata_cache::{DEFAULT_TTL, TickerCache};

// Providers
#[cfg(feature = "yahoo")]
pub use stockdata_yahoo::{YahooEndpoints, YahooFactory, YahooTicker};

mod history;
mod info;
mod market;

pub use history::HistoryIter;
pub use market::MarketData;
