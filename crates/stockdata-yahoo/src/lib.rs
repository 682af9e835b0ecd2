#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stockdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance ticker handles.
//!
//! This crate implements the [`HandleFactory`] and [`TickerHandle`] traits
//! from `stockdata-core` on top of Yahoo Finance's public endpoints.
//!
//! # Features
//!
//! - Daily price history through the chart API
//! - Full dividend history from the chart API's dividend events
//! - Quote and fundamentals snapshot through the quoteSummary API
//! - Cookie/crumb session negotiated once per ticker handle, renewed after a 401
//!
//! # Example
//!
//! ```no_run
//! use stockdata_core::{HandleFactory, HistoryPeriod, Symbol};
//! use stockdata_yahoo::YahooFactory;
//!
//! # async fn example() -> stockdata_core::Result<()> {
//! let factory = YahooFactory::new()?;
//! let ticker = factory.create(&Symbol::new("AAPL"))?;
//!
//! let df = ticker.history(HistoryPeriod::OneYear).await?;
//! println!("Fetched {} rows", df.height());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use polars::prelude::DataFrame;
use reqwest::{StatusCode, Url, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use stockdata_core::{
    DataError, Dividend, HandleFactory, HistoryPeriod, InfoSnapshot, PriceBar, Result, Symbol,
    TickerHandle, frame,
};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// URL that hands out the session cookie.
const COOKIE_URL: &str = "https://fc.yahoo.com";

/// URL that exchanges the session cookie for a crumb.
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";

/// quoteSummary modules merged into the info snapshot.
const INFO_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile,calendarEvents";

/// Default upstream request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

const PROVIDER_NAME: &str = "Yahoo Finance";

/// Endpoint URLs used by [`YahooTicker`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YahooEndpoints {
    /// Chart API base; the symbol is appended as a path segment.
    pub chart: String,
    /// quoteSummary API base; the symbol is appended as a path segment.
    pub quote_summary: String,
    /// Session cookie URL.
    pub cookie: String,
    /// Crumb URL.
    pub crumb: String,
}

impl YahooEndpoints {
    /// Endpoints rooted at `base`, using Yahoo's path layout.
    ///
    /// Intended for pointing the client at a local mock server.
    #[must_use]
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            chart: format!("{base}/v8/finance/chart"),
            quote_summary: format!("{base}/v10/finance/quoteSummary"),
            cookie: format!("{base}/"),
            crumb: format!("{base}/v1/test/getcrumb"),
        }
    }
}

impl Default for YahooEndpoints {
    fn default() -> Self {
        Self {
            chart: CHART_API_URL.to_string(),
            quote_summary: QUOTE_SUMMARY_URL.to_string(),
            cookie: COOKIE_URL.to_string(),
            crumb: CRUMB_URL.to_string(),
        }
    }
}

/// Builds [`YahooTicker`] handles sharing one HTTP client.
#[derive(Clone, Debug)]
pub struct YahooFactory {
    client: reqwest::Client,
    endpoints: Arc<YahooEndpoints>,
}

impl YahooFactory {
    /// Create a factory with the default 30 second request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a factory whose requests fail with [`DataError::Timeout`]
    /// after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create a factory with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoints: Arc::new(YahooEndpoints::default()),
        }
    }

    /// Replace the endpoint URLs.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: YahooEndpoints) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }
}

impl HandleFactory for YahooFactory {
    fn create(&self, symbol: &Symbol) -> Result<Arc<dyn TickerHandle>> {
        Ok(Arc::new(YahooTicker::new(
            symbol.clone(),
            self.client.clone(),
            Arc::clone(&self.endpoints),
        )))
    }
}

/// Cookie and crumb pair required by the quoteSummary API.
#[derive(Debug, Clone)]
struct Session {
    cookie: String,
    crumb: String,
}

/// Yahoo Finance session for a single symbol.
///
/// Implements [`TickerHandle`]. The cookie/crumb session and the dividend
/// series are fetched at most once per ticker; failed attempts are not
/// memoized. A session rejected with 401 is dropped and renegotiated on the
/// next info request.
#[derive(Debug)]
pub struct YahooTicker {
    symbol: Symbol,
    client: reqwest::Client,
    endpoints: Arc<YahooEndpoints>,
    session: Mutex<Option<Session>>,
    dividends: OnceCell<Vec<Dividend>>,
}

impl YahooTicker {
    /// Create a ticker. Performs no I/O.
    #[must_use]
    pub fn new(symbol: Symbol, client: reqwest::Client, endpoints: Arc<YahooEndpoints>) -> Self {
        Self {
            symbol,
            client,
            endpoints,
            session: Mutex::new(None),
            dividends: OnceCell::new(),
        }
    }

    /// Fetch the chart for `range` and return the first result.
    async fn fetch_chart(&self, range: &str, interval: &str) -> Result<ChartData> {
        let url = symbol_url(&self.endpoints.chart, &self.symbol)?;
        debug!("Fetching chart: {} range={} interval={}", url, range, interval);

        let response = self
            .client
            .get(url)
            .query(&[("range", range), ("interval", interval), ("events", "div")])
            .send()
            .await
            .map_err(request_error)?;

        let chart: ChartResponse = decode(self.check_status(response)?).await?;

        if let Some(error) = chart.chart.error {
            if error.code == "Not Found" {
                return Err(DataError::SymbolNotFound(self.symbol.to_string()));
            }
            return Err(DataError::Upstream(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        chart
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| DataError::SymbolNotFound(self.symbol.to_string()))
    }

    async fn fetch_dividends(&self) -> Result<Vec<Dividend>> {
        let data = self.fetch_chart(HistoryPeriod::Max.as_str(), "1mo").await?;
        Ok(parse_dividends(&data))
    }

    /// Negotiate the cookie/crumb pair.
    async fn open_session(&self) -> Result<Session> {
        debug!("Opening Yahoo session for {}", self.symbol);

        // The cookie endpoint answers 404 but still sets the cookie.
        let response = self
            .client
            .get(&self.endpoints.cookie)
            .send()
            .await
            .map_err(request_error)?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .ok_or_else(|| DataError::Upstream("Missing Yahoo session cookie".to_string()))?
            .to_string();

        let response = self
            .client
            .get(&self.endpoints.crumb)
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .map_err(request_error)?;

        let crumb = self
            .check_status(response)?
            .text()
            .await
            .map_err(body_error)?;
        let crumb = crumb.trim().to_string();

        if crumb.is_empty() || crumb.contains('<') {
            return Err(DataError::Upstream("Invalid Yahoo crumb".to_string()));
        }

        Ok(Session { cookie, crumb })
    }

    /// Returns the current session, negotiating one if none is held.
    async fn session(&self) -> Result<Session> {
        let mut session = self.session.lock().await;
        if let Some(session) = session.as_ref() {
            return Ok(session.clone());
        }

        let opened = self.open_session().await?;
        *session = Some(opened.clone());
        Ok(opened)
    }

    async fn fetch_quote_summary(&self) -> Result<Map<String, Value>> {
        let session = self.session().await?;

        let url = symbol_url(&self.endpoints.quote_summary, &self.symbol)?;
        debug!("Fetching quote summary: {}", url);

        let response = self
            .client
            .get(url)
            .query(&[("modules", INFO_MODULES), ("crumb", session.crumb.as_str())])
            .header(header::COOKIE, &session.cookie)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Yahoo rejected the session for {}, dropping it", self.symbol);
            self.session.lock().await.take();
        }

        let summary: QuoteSummaryResponse = decode(self.check_status(response)?).await?;

        if let Some(error) = summary.quote_summary.error {
            return Err(DataError::Upstream(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        summary
            .quote_summary
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| DataError::SymbolNotFound(self.symbol.to_string()))
    }

    fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(DataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
            }),
            StatusCode::NOT_FOUND => Err(DataError::SymbolNotFound(self.symbol.to_string())),
            status if !status.is_success() => Err(DataError::Network(format!(
                "HTTP {} for {}",
                status, self.symbol
            ))),
            _ => Ok(response),
        }
    }
}

#[async_trait]
impl TickerHandle for YahooTicker {
    fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    async fn history(&self, period: HistoryPeriod) -> Result<DataFrame> {
        let data = self.fetch_chart(period.as_str(), "1d").await?;
        let bars = parse_history(&data);
        debug!("Fetched {} price rows for {}", bars.len(), self.symbol);
        frame::price_frame(&bars)
    }

    async fn dividends(&self) -> Result<DataFrame> {
        let dividends = self
            .dividends
            .get_or_try_init(|| self.fetch_dividends())
            .await?;
        frame::dividend_frame(dividends)
    }

    async fn info(&self) -> Result<InfoSnapshot> {
        let modules = self.fetch_quote_summary().await?;
        Ok(flatten_modules(&modules))
    }
}

/// Append `symbol` to `base` as a percent-encoded path segment.
fn symbol_url(base: &str, symbol: &Symbol) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| DataError::Other(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| DataError::Other(format!("{base}: cannot be a base URL")))?
        .pop_if_empty()
        .push(symbol.as_str());
    Ok(url)
}

fn request_error(e: reqwest::Error) -> DataError {
    if e.is_timeout() {
        DataError::Timeout(e.to_string())
    } else {
        DataError::Network(e.to_string())
    }
}

fn body_error(e: reqwest::Error) -> DataError {
    if e.is_timeout() {
        DataError::Timeout(e.to_string())
    } else {
        DataError::Parse(e.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response.json::<T>().await.map_err(body_error)
}

/// Convert an epoch timestamp to the exchange-local calendar date.
fn local_date(timestamp: i64, gmt_offset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp.checked_add(gmt_offset)?, 0).map(|dt| dt.date_naive())
}

/// Turn chart rows into daily bars.
///
/// Rows missing any of open/high/low/close are skipped; a missing volume
/// counts as zero.
fn parse_history(data: &ChartData) -> Vec<PriceBar> {
    let Some(timestamps) = data.timestamp.as_deref() else {
        return Vec::new();
    };
    let Some(quote) = data.indicators.quote.first() else {
        return Vec::new();
    };
    let offset = data.gmt_offset();
    let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    let mut skipped = 0usize;
    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let row = (
            local_date(ts, offset),
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        );
        let (Some(date), Some(open), Some(high), Some(low), Some(close)) = row else {
            skipped += 1;
            continue;
        };
        let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);
        bars.push(PriceBar::new(date, open, high, low, close, volume));
    }

    if skipped > 0 {
        warn!("Skipped {} incomplete price rows", skipped);
    }

    bars.sort_by_key(|bar| bar.date);
    bars
}

/// Extract dividend events, ascending by date.
fn parse_dividends(data: &ChartData) -> Vec<Dividend> {
    let offset = data.gmt_offset();
    let mut dividends: Vec<Dividend> = data
        .events
        .as_ref()
        .map(|events| &events.dividends)
        .into_iter()
        .flat_map(|dividends| dividends.values())
        .filter_map(|event| Some(Dividend::new(local_date(event.date, offset)?, event.amount)))
        .collect();

    dividends.sort_by_key(|dividend| dividend.date);
    dividends
}

/// Merge quoteSummary modules into one flat field map.
///
/// `{raw, fmt}` wrappers collapse to their raw value, empty objects and
/// nulls count as absent, nested objects are merged, and the first
/// occurrence of a key wins. The first scheduled earnings date is exposed
/// as `earningsTimestamp`.
fn flatten_modules(modules: &Map<String, Value>) -> InfoSnapshot {
    let mut snapshot = InfoSnapshot::new();
    for module in modules.values() {
        if let Value::Object(fields) = module {
            flatten_into(&mut snapshot, fields);
        }
    }

    if !snapshot.contains_key("earningsTimestamp") {
        let earnings = modules
            .get("calendarEvents")
            .and_then(|events| events.pointer("/earnings/earningsDate/0/raw"));
        if let Some(timestamp) = earnings {
            snapshot.insert("earningsTimestamp".to_string(), timestamp.clone());
        }
    }

    snapshot
}

fn flatten_into(snapshot: &mut InfoSnapshot, fields: &Map<String, Value>) {
    for (key, value) in fields {
        let leaf = match value {
            Value::Object(inner) => match inner.get("raw") {
                Some(raw) => raw,
                None => {
                    flatten_into(snapshot, inner);
                    continue;
                }
            },
            Value::Array(_) => continue,
            other => other,
        };
        if !leaf.is_null() && !snapshot.contains_key(key) {
            snapshot.insert(key.clone(), leaf.clone());
        }
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
    events: Option<ChartEvents>,
}

impl ChartData {
    fn gmt_offset(&self) -> i64 {
        self.meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<Map<String, Value>>>,
    error: Option<ApiError>,
}
