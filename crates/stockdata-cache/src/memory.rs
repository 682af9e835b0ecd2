//! In-memory ticker handle cache.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stockdata_core::{Clock, HandleFactory, Result, Symbol, SystemClock, TickerHandle};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Default time-to-live for cached handles.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache entry with timestamp for TTL-based expiry.
///
/// Entries are never mutated; an expired entry is replaced by a new one.
#[derive(Debug, Clone)]
struct CacheEntry {
    handle: Arc<dyn TickerHandle>,
    created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(handle: Arc<dyn TickerHandle>, created_at: DateTime<Utc>) -> Self {
        Self { handle, created_at }
    }

    fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.created_at) < ttl
    }
}

/// Process-local cache of upstream handles keyed by symbol.
///
/// Holds at most one entry per symbol. An entry younger than the TTL is
/// served as is; an older one is treated as absent and overwritten by the
/// next [`acquire`](Self::acquire). The map lock is only held for the lookup
/// and the insert, never while a handle is being constructed or queried.
///
/// Two concurrent misses for the same symbol may both construct a handle.
/// The last insert wins and both callers receive a usable handle.
pub struct TickerCache {
    entries: RwLock<HashMap<Symbol, CacheEntry>>,
    factory: Arc<dyn HandleFactory>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl std::fmt::Debug for TickerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickerCache")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TickerCache {
    /// Create an empty cache using `factory` for misses and the default TTL.
    #[must_use]
    pub fn new(factory: Arc<dyn HandleFactory>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            factory,
            clock: Arc::new(SystemClock),
            ttl: to_time_delta(DEFAULT_TTL),
        }
    }

    /// Set the time-to-live for new and existing entries.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = to_time_delta(ttl);
        self
    }

    /// Set the clock used for expiry decisions.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Returns a handle for `symbol`, creating one if none is fresh.
    ///
    /// The symbol is used verbatim as the key. If the factory fails, the
    /// error is returned and the cache is left unchanged.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn acquire(&self, symbol: &Symbol) -> Result<Arc<dyn TickerHandle>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(symbol) {
                if entry.is_fresh(now, self.ttl) {
                    debug!("Cache hit for ticker handle");
                    return Ok(Arc::clone(&entry.handle));
                }
                debug!(created_at = %entry.created_at, "Ticker handle expired");
            } else {
                debug!("Cache miss for ticker handle");
            }
        }

        let handle = self.factory.create(symbol)?;
        let entry = CacheEntry::new(Arc::clone(&handle), self.clock.now());
        self.entries.write().await.insert(symbol.clone(), entry);
        Ok(handle)
    }

    /// Returns the number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Removes entries older than the TTL.
    ///
    /// Returns the number of entries removed.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Purged {} expired ticker handles", removed);
        }

        removed
    }

    /// Removes all entries.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Cleared all ticker handles");
    }
}

fn to_time_delta(ttl: Duration) -> TimeDelta {
    TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use polars::prelude::DataFrame;
    use stockdata_core::testing::{FakeFactory, FakeHandle, ManualClock};
    use stockdata_core::{HistoryPeriod, InfoSnapshot};
    use tokio::sync::Notify;

    fn cache_with_clock() -> (TickerCache, Arc<FakeFactory>, Arc<ManualClock>) {
        let factory = Arc::new(FakeFactory::new(FakeHandle::default()));
        let clock = Arc::new(ManualClock::default());
        let cache = TickerCache::new(factory.clone()).with_clock(clock.clone());
        (cache, factory, clock)
    }

    #[tokio::test]
    async fn test_acquire_within_ttl_returns_same_handle() {
        let (cache, factory, clock) = cache_with_clock();
        let symbol = Symbol::new("AAPL");

        let first = cache.acquire(&symbol).await.unwrap();
        clock.advance(TimeDelta::seconds(299));
        let second = cache.acquire(&symbol).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created(), 1);
        assert_eq!(first.symbol(), &symbol);
    }

    #[tokio::test]
    async fn test_acquire_after_ttl_creates_new_handle() {
        let (cache, factory, clock) = cache_with_clock();
        let symbol = Symbol::new("AAPL");

        let first = cache.acquire(&symbol).await.unwrap();
        clock.advance(TimeDelta::seconds(301));
        let second = cache.acquire(&symbol).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created(), 2);
        assert_eq!(cache.len().await, 1);

        // The replacement is fresh again.
        let third = cache.acquire(&symbol).await.unwrap();
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(factory.created(), 2);
    }

    #[tokio::test]
    async fn test_entry_expires_at_exactly_ttl() {
        let (cache, factory, clock) = cache_with_clock();
        let symbol = Symbol::new("MSFT");

        cache.acquire(&symbol).await.unwrap();
        clock.advance(TimeDelta::seconds(300));
        cache.acquire(&symbol).await.unwrap();

        assert_eq!(factory.created(), 2);
    }

    #[tokio::test]
    async fn test_custom_ttl() {
        let (cache, factory, clock) = cache_with_clock();
        let cache = cache.with_ttl(Duration::from_secs(10));
        let symbol = Symbol::new("MSFT");

        assert_eq!(cache.ttl(), Duration::from_secs(10));
        cache.acquire(&symbol).await.unwrap();
        clock.advance(TimeDelta::seconds(11));
        cache.acquire(&symbol).await.unwrap();

        assert_eq!(factory.created(), 2);
    }

    #[tokio::test]
    async fn test_symbols_are_distinct_keys() {
        let (cache, factory, _clock) = cache_with_clock();

        let upper = cache.acquire(&Symbol::new("AAPL")).await.unwrap();
        let lower = cache.acquire(&Symbol::new("aapl")).await.unwrap();
        let other = cache.acquire(&Symbol::new("MSFT")).await.unwrap();

        assert!(!Arc::ptr_eq(&upper, &lower));
        assert!(!Arc::ptr_eq(&upper, &other));
        assert_eq!(lower.symbol().as_str(), "aapl");
        assert_eq!(factory.created(), 3);
        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn test_factory_failure_stores_nothing() {
        let cache = TickerCache::new(Arc::new(FakeFactory::broken("no session")));

        let err = cache.acquire(&Symbol::new("AAPL")).await.unwrap_err();

        assert!(err.to_string().contains("no session"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_closure_factory() {
        let factory = |symbol: &Symbol| -> Result<Arc<dyn TickerHandle>> {
            Ok(Arc::new(FakeHandle::new(symbol.clone())))
        };
        let cache = TickerCache::new(Arc::new(factory));

        let handle = cache.acquire(&Symbol::new("IBM")).await.unwrap();
        assert_eq!(handle.symbol().as_str(), "IBM");
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_fresh_entries() {
        let (cache, _factory, clock) = cache_with_clock();

        cache.acquire(&Symbol::new("OLD")).await.unwrap();
        clock.advance(TimeDelta::seconds(200));
        cache.acquire(&Symbol::new("NEW")).await.unwrap();
        clock.advance(TimeDelta::seconds(200));

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let (cache, factory, _clock) = cache_with_clock();
        let symbol = Symbol::new("AAPL");

        cache.acquire(&symbol).await.unwrap();
        cache.clear().await;
        assert!(cache.is_empty().await);

        cache.acquire(&symbol).await.unwrap();
        assert_eq!(factory.created(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_same_symbol() {
        let factory = Arc::new(FakeFactory::new(FakeHandle::default()));
        let cache = Arc::new(TickerCache::new(factory.clone()));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.acquire(&Symbol::new("AAPL")).await })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            let handle = result.unwrap().unwrap();
            assert_eq!(handle.symbol().as_str(), "AAPL");
        }

        assert_eq!(cache.len().await, 1);
        assert!(factory.created() >= 1);
    }

    /// Handle whose queries park until released.
    #[derive(Debug)]
    struct GatedHandle {
        symbol: Symbol,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl TickerHandle for GatedHandle {
        fn symbol(&self) -> &Symbol {
            &self.symbol
        }

        async fn history(&self, _period: HistoryPeriod) -> Result<DataFrame> {
            self.gate.notified().await;
            Ok(DataFrame::empty())
        }

        async fn dividends(&self) -> Result<DataFrame> {
            self.gate.notified().await;
            Ok(DataFrame::empty())
        }

        async fn info(&self) -> Result<InfoSnapshot> {
            self.gate.notified().await;
            Ok(InfoSnapshot::new())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_inflight_query_does_not_block_cache() {
        let gate = Arc::new(Notify::new());
        let factory_gate = Arc::clone(&gate);
        let factory = move |symbol: &Symbol| -> Result<Arc<dyn TickerHandle>> {
            Ok(Arc::new(GatedHandle {
                symbol: symbol.clone(),
                gate: Arc::clone(&factory_gate),
            }))
        };
        let cache = Arc::new(TickerCache::new(Arc::new(factory)));

        let slow = cache.acquire(&Symbol::new("SLOW")).await.unwrap();
        let inflight = tokio::spawn(async move { slow.history(HistoryPeriod::Max).await });

        let bounded = Duration::from_secs(1);
        let other = tokio::time::timeout(bounded, cache.acquire(&Symbol::new("FAST"))).await;
        assert!(other.unwrap().is_ok());
        let same = tokio::time::timeout(bounded, cache.acquire(&Symbol::new("SLOW"))).await;
        assert!(same.unwrap().is_ok());
        assert!(!inflight.is_finished());

        gate.notify_one();
        assert!(inflight.await.unwrap().is_ok());
    }
}
