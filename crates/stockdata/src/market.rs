//! Data fetchers backed by the ticker handle cache.

use std::sync::Arc;

use stockdata_cache::TickerCache;
use stockdata_core::{BasicInfo, Dividend, HistoryPeriod, Result, Symbol, frame};
use tracing::{debug, instrument};

use crate::history::HistoryIter;
use crate::info;

/// Read operations for a single symbol.
///
/// Every operation acquires a handle from the shared [`TickerCache`] and
/// queries it outside the cache's lock. The handle is dropped when the
/// operation returns.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use stockdata::{HistoryPeriod, MarketData, Symbol, TickerCache, YahooFactory};
///
/// let cache = Arc::new(TickerCache::new(Arc::new(YahooFactory::new()?)));
/// let market = MarketData::new(cache);
///
/// for day in market.fetch_history(&Symbol::new("AAPL"), HistoryPeriod::OneMonth).await? {
///     println!("{} {}", day.date, day.close);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MarketData {
    cache: Arc<TickerCache>,
}

impl MarketData {
    /// Create fetchers sharing `cache`.
    #[must_use]
    pub const fn new(cache: Arc<TickerCache>) -> Self {
        Self { cache }
    }

    /// Returns the underlying handle cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<TickerCache> {
        &self.cache
    }

    /// Fetch daily prices for `period`, each joined with the dividend paid
    /// on the same date.
    #[instrument(skip(self), fields(symbol = %symbol, period = %period))]
    pub async fn fetch_history(&self, symbol: &Symbol, period: HistoryPeriod) -> Result<HistoryIter> {
        let handle = self.cache.acquire(symbol).await?;

        let prices = handle.history(period).await?;
        let dividends = handle.dividends().await?;

        let bars = frame::price_bars(&prices)?;
        let dividends = frame::dividends(&dividends)?;
        debug!(
            rows = bars.len(),
            dividends = dividends.len(),
            "Fetched price history"
        );

        Ok(HistoryIter::new(bars, dividends))
    }

    /// Fetch the dividend series, ascending by date.
    ///
    /// A symbol that never paid a dividend yields an empty vector. Rows with a
    /// non-positive amount are dropped.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn fetch_dividends(&self, symbol: &Symbol) -> Result<Vec<Dividend>> {
        let handle = self.cache.acquire(symbol).await?;

        let mut dividends = frame::dividends(&handle.dividends().await?)?;
        dividends.retain(|dividend| dividend.amount > 0.0);
        dividends.sort_by_key(|dividend| dividend.date);
        debug!(count = dividends.len(), "Fetched dividends");

        Ok(dividends)
    }

    /// Fetch a fresh quote and fundamentals snapshot.
    ///
    /// The result is never cached; only the handle behind it is.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn fetch_basic_info(&self, symbol: &Symbol) -> Result<BasicInfo> {
        let handle = self.cache.acquire(symbol).await?;

        let snapshot = handle.info().await?;
        debug!(fields = snapshot.len(), "Fetched info snapshot");

        Ok(info::basic_info(&snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use stockdata_core::testing::{FakeFactory, FakeHandle};
    use stockdata_core::{DataError, PriceBar};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(template: FakeHandle) -> (MarketData, Arc<FakeFactory>) {
        let factory = Arc::new(FakeFactory::new(template));
        let cache = Arc::new(TickerCache::new(factory.clone()));
        (MarketData::new(cache), factory)
    }

    fn june_15() -> PriceBar {
        PriceBar::new(date(2024, 6, 15), 100.0, 102.0, 99.0, 101.0, 1000)
    }

    #[tokio::test]
    async fn test_history_carries_dividend_on_same_date() {
        let (market, _) = setup(
            FakeHandle::default()
                .with_bars(vec![june_15()])
                .with_dividends(vec![Dividend::new(date(2024, 6, 15), 0.5)]),
        );

        let days: Vec<_> = market
            .fetch_history(&Symbol::new("AAPL"), HistoryPeriod::OneYear)
            .await
            .unwrap()
            .collect();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, date(2024, 6, 15));
        assert_eq!(days[0].close, 101.0);
        assert_eq!(days[0].dividend, 0.5);
    }

    #[tokio::test]
    async fn test_history_without_dividends_defaults_to_zero() {
        let (market, _) = setup(FakeHandle::default().with_bars(vec![june_15()]));

        let days: Vec<_> = market
            .fetch_history(&Symbol::new("AAPL"), HistoryPeriod::OneYear)
            .await
            .unwrap()
            .collect();

        assert_eq!(days[0].dividend, 0.0);
    }

    #[tokio::test]
    async fn test_fetchers_share_one_handle() {
        let (market, factory) = setup(FakeHandle::default().with_bars(vec![june_15()]));
        let symbol = Symbol::new("AAPL");

        market.fetch_history(&symbol, HistoryPeriod::FiveDays).await.unwrap();
        market.fetch_dividends(&symbol).await.unwrap();
        market.fetch_basic_info(&symbol).await.unwrap();

        assert_eq!(factory.created(), 1);
        assert_eq!(factory.query_count(), 4);
    }

    #[tokio::test]
    async fn test_dividends_ascending_and_empty() {
        let (market, _) = setup(FakeHandle::default().with_dividends(vec![
            Dividend::new(date(2024, 5, 10), 0.25),
            Dividend::new(date(2024, 2, 9), 0.24),
        ]));
        let dividends = market.fetch_dividends(&Symbol::new("AAPL")).await.unwrap();
        assert_eq!(dividends[0].date, date(2024, 2, 9));
        assert_eq!(dividends[1].amount, 0.25);

        let (market, _) = setup(FakeHandle::default());
        let dividends = market.fetch_dividends(&Symbol::new("BRK-B")).await.unwrap();
        assert!(dividends.is_empty());
    }

    #[tokio::test]
    async fn test_basic_info_mapping() {
        let info = json!({ "shortName": "AAPL", "beta": 1.2 });
        let (market, _) = setup(
            FakeHandle::default().with_info(info.as_object().unwrap().clone()),
        );

        let info = market.fetch_basic_info(&Symbol::new("AAPL")).await.unwrap();

        assert_eq!(info.name.as_deref(), Some("AAPL"));
        assert_eq!(info.beta, Some(1.2));
        assert_eq!(info.eps, None);
    }

    #[tokio::test]
    async fn test_upstream_failures_propagate() {
        let (market, _) = setup(FakeHandle::default().failing("API secret details"));
        let symbol = Symbol::new("AAPL");

        let history = market.fetch_history(&symbol, HistoryPeriod::Max).await;
        let dividends = market.fetch_dividends(&symbol).await;
        let info = market.fetch_basic_info(&symbol).await;

        assert!(matches!(history, Err(DataError::Upstream(_))));
        assert!(matches!(dividends, Err(DataError::Upstream(_))));
        assert!(matches!(info, Err(DataError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_handle_construction_failure_propagates() {
        let cache = Arc::new(TickerCache::new(Arc::new(FakeFactory::broken("boom"))));
        let market = MarketData::new(cache);

        let err = market.fetch_basic_info(&Symbol::new("AAPL")).await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert!(market.cache().is_empty().await);
    }
}
