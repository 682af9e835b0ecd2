//! Route table and request handlers.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    http::{Uri, header::CACHE_CONTROL},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use stockdata::{HistoricalPrice, HistoryPeriod, MarketData, Symbol};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::{ApiError, ApiResult, panic_response};
use crate::middleware::{default_cache_control, log_requests};

/// `Cache-Control` max-age for `/info`, in seconds.
pub const INFO_MAX_AGE: u32 = 300;
/// `Cache-Control` max-age for `/dividends`, in seconds.
pub const DIVIDENDS_MAX_AGE: u32 = 3600;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    market: MarketData,
}

impl AppState {
    /// Wraps the data fetchers.
    pub const fn new(market: MarketData) -> Self {
        Self { market }
    }
}

/// `Cache-Control` max-age for a history response covering `period`.
pub const fn history_max_age(period: HistoryPeriod) -> u32 {
    match period {
        HistoryPeriod::OneDay => 120,
        HistoryPeriod::FiveDays => 300,
        HistoryPeriod::OneMonth | HistoryPeriod::ThreeMonths | HistoryPeriod::YearToDate => 3600,
        HistoryPeriod::SixMonths => 7200,
        HistoryPeriod::OneYear => 14400,
        HistoryPeriod::TwoYears => 43200,
        HistoryPeriod::FiveYears | HistoryPeriod::TenYears | HistoryPeriod::Max => 86400,
    }
}

/// Builds the application router with logging, panic and cache-header layers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/history/{symbol}/{period}", get(history))
        .route("/dividends/{symbol}", get(dividends))
        .route("/info/{symbol}", get(info))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(middleware::from_fn(default_cache_control))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

fn cached(max_age: u32, body: impl IntoResponse) -> Response {
    (
        [(CACHE_CONTROL, format!("public, max-age={max_age}"))],
        body,
    )
        .into_response()
}

/// Decodes path segment `index` of `uri`, replacing invalid UTF-8.
fn lossy_segment(uri: &Uri, index: usize) -> String {
    uri.path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .nth(index)
        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().into_owned())
        .unwrap_or_default()
}

async fn history(
    State(state): State<AppState>,
    uri: Uri,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Response> {
    // Rejected before the cache is touched.
    let (symbol, period) = match path {
        Ok(Path((symbol, period))) => (symbol, period.parse::<HistoryPeriod>()?),
        Err(_) => {
            lossy_segment(&uri, 2).parse::<HistoryPeriod>()?;
            return Err(ApiError::InvalidSymbol(lossy_segment(&uri, 1)));
        }
    };

    let prices: Vec<HistoricalPrice> = state
        .market
        .fetch_history(&Symbol::new(symbol), period)
        .await?
        .collect();

    Ok(cached(history_max_age(period), Json(prices)))
}

fn symbol_param(uri: &Uri, path: Result<Path<String>, PathRejection>) -> ApiResult<Symbol> {
    match path {
        Ok(Path(symbol)) => Ok(Symbol::new(symbol)),
        Err(_) => Err(ApiError::InvalidSymbol(lossy_segment(uri, 1))),
    }
}

async fn dividends(
    State(state): State<AppState>,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let dividends = state.market.fetch_dividends(&symbol_param(&uri, path)?).await?;
    Ok(cached(DIVIDENDS_MAX_AGE, Json(dividends)))
}

async fn info(
    State(state): State<AppState>,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let info = state.market.fetch_basic_info(&symbol_param(&uri, path)?).await?;
    Ok(cached(INFO_MAX_AGE, Json(info)))
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    cached_handles: usize,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cached_handles: state.market.cache().len().await,
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
