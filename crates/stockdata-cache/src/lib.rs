#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stockdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Ticker handle caching.
//!
//! - [`TickerCache`] - In-memory TTL cache of [`TickerHandle`]s keyed by symbol
//!
//! [`TickerHandle`]: stockdata_core::TickerHandle

/// In-memory ticker handle cache.
pub mod memory;

pub use memory::{DEFAULT_TTL, TickerCache};
