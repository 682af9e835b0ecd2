//! Test doubles for the collaborator traits.
//!
//! Available with the `test-utils` feature.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use polars::prelude::DataFrame;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    clock::Clock,
    error::{DataError, Result},
    frame,
    period::HistoryPeriod,
    provider::{HandleFactory, TickerHandle},
    types::{Dividend, InfoSnapshot, PriceBar, Symbol},
};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scripted handle serving canned data.
///
/// Every query fails with [`DataError::Upstream`] once [`FakeHandle::failing`]
/// has been set.
#[derive(Clone, Debug, Default)]
pub struct FakeHandle {
    symbol: Symbol,
    bars: Vec<PriceBar>,
    dividends: Vec<Dividend>,
    info: InfoSnapshot,
    failure: Option<String>,
    queries: Arc<AtomicUsize>,
}

impl FakeHandle {
    /// Creates a handle for `symbol` with no data.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Sets the price rows returned by `history`, regardless of period.
    #[must_use]
    pub fn with_bars(mut self, bars: Vec<PriceBar>) -> Self {
        self.bars = bars;
        self
    }

    /// Sets the dividend series.
    #[must_use]
    pub fn with_dividends(mut self, dividends: Vec<Dividend>) -> Self {
        self.dividends = dividends;
        self
    }

    /// Sets the info snapshot.
    #[must_use]
    pub fn with_info(mut self, info: InfoSnapshot) -> Self {
        self.info = info;
        self
    }

    /// Makes every query fail with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Returns how many queries were made through this handle and its clones.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(DataError::Upstream(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TickerHandle for FakeHandle {
    fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    async fn history(&self, _period: HistoryPeriod) -> Result<DataFrame> {
        self.record()?;
        frame::price_frame(&self.bars)
    }

    async fn dividends(&self) -> Result<DataFrame> {
        self.record()?;
        frame::dividend_frame(&self.dividends)
    }

    async fn info(&self) -> Result<InfoSnapshot> {
        self.record()?;
        Ok(self.info.clone())
    }
}

/// Factory stamping out copies of a template [`FakeHandle`].
///
/// Each created handle carries the requested symbol; all copies share the
/// template's query counter.
#[derive(Debug, Default)]
pub struct FakeFactory {
    template: FakeHandle,
    construction_error: Option<String>,
    created: AtomicUsize,
}

impl FakeFactory {
    /// Creates a factory cloning `template` for every symbol.
    #[must_use]
    pub fn new(template: FakeHandle) -> Self {
        Self {
            template,
            ..Default::default()
        }
    }

    /// Creates a factory whose construction always fails with `message`.
    #[must_use]
    pub fn broken(message: impl Into<String>) -> Self {
        Self {
            construction_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Returns how many handles have been constructed.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Returns the number of queries made through any created handle.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.template.query_count()
    }
}

impl HandleFactory for FakeFactory {
    fn create(&self, symbol: &Symbol) -> Result<Arc<dyn TickerHandle>> {
        if let Some(message) = &self.construction_error {
            return Err(DataError::Other(message.clone()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let mut handle = self.template.clone();
        handle.symbol = symbol.clone();
        Ok(Arc::new(handle))
    }
}
