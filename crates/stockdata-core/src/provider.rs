//! Collaborator traits for the upstream market-data provider.
//!
//! This module defines the two seams between the service and its provider:
//!
//! - [`TickerHandle`] - Upstream client session bound to one symbol
//! - [`HandleFactory`] - Builds a fresh handle for a symbol on cache miss

use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::fmt::Debug;
use std::sync::Arc;

use crate::{
    error::Result,
    period::HistoryPeriod,
    types::{InfoSnapshot, Symbol},
};

/// Upstream client session for a single symbol.
///
/// Handles are cheap to construct; network I/O only happens when one of the
/// query methods is awaited. A handle may memoize session-level state
/// between queries, which is why the handle cache bounds its lifetime.
#[async_trait]
pub trait TickerHandle: Send + Sync + Debug {
    /// Returns the symbol this handle was created for.
    fn symbol(&self) -> &Symbol;

    /// Fetches daily prices for the given period.
    ///
    /// Returns a DataFrame with columns: date, open, high, low, close, volume.
    async fn history(&self, period: HistoryPeriod) -> Result<DataFrame>;

    /// Fetches the full dividend series.
    ///
    /// Returns a DataFrame with columns: date, amount. An empty frame is a
    /// valid answer for symbols that never paid a dividend.
    async fn dividends(&self) -> Result<DataFrame>;

    /// Fetches the provider's quote and fundamentals snapshot.
    async fn info(&self) -> Result<InfoSnapshot>;
}

/// Builds upstream handles on demand.
///
/// Construction must be a local operation; it must not perform network I/O.
/// Any closure `Fn(&Symbol) -> Result<Arc<dyn TickerHandle>>` is a factory.
pub trait HandleFactory: Send + Sync {
    /// Creates a new handle for `symbol`.
    fn create(&self, symbol: &Symbol) -> Result<Arc<dyn TickerHandle>>;
}

impl<F> HandleFactory for F
where
    F: Fn(&Symbol) -> Result<Arc<dyn TickerHandle>> + Send + Sync,
{
    fn create(&self, symbol: &Symbol) -> Result<Arc<dyn TickerHandle>> {
        self(symbol)
    }
}
