//! Mapping from the provider's info snapshot to [`BasicInfo`].

use chrono::DateTime;
use serde_json::Value;
use stockdata_core::{BasicInfo, EarningsDate, InfoSnapshot};

/// Build a [`BasicInfo`] from a raw snapshot.
///
/// `name` prefers `longName` over `shortName` and `price` prefers
/// `currentPrice` over `regularMarketPrice`; every other field reads a single
/// key. A value of the wrong JSON type counts as absent.
pub(crate) fn basic_info(info: &InfoSnapshot) -> BasicInfo {
    BasicInfo {
        name: text(info, "longName").or_else(|| text(info, "shortName")),
        price: number(info, "currentPrice").or_else(|| number(info, "regularMarketPrice")),
        pe_ratio: number(info, "forwardPE"),
        pb_ratio: number(info, "priceToBook"),
        eps: number(info, "trailingEps"),
        roe: number(info, "returnOnEquity"),
        market_cap: number(info, "marketCap"),
        recommendation: text(info, "recommendationKey"),
        analyst_count: count(info, "numberOfAnalystOpinions"),
        fifty_two_week_high: number(info, "fiftyTwoWeekHigh"),
        fifty_two_week_low: number(info, "fiftyTwoWeekLow"),
        beta: number(info, "beta"),
        sector: text(info, "sector"),
        industry: text(info, "industry"),
        earnings_date: earnings_date(info),
        dividend_rate: number(info, "dividendRate"),
        trailing_annual_dividend_rate: number(info, "trailingAnnualDividendRate"),
    }
}

/// Empty strings are treated as absent.
fn text(info: &InfoSnapshot, key: &str) -> Option<String> {
    info.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(info: &InfoSnapshot, key: &str) -> Option<f64> {
    info.get(key).and_then(Value::as_f64)
}

fn count(info: &InfoSnapshot, key: &str) -> Option<u64> {
    info.get(key).and_then(Value::as_u64)
}

/// Convert `earningsTimestamp` (epoch seconds) to a calendar date, keeping
/// the raw value as a string when it cannot be converted.
fn earnings_date(info: &InfoSnapshot) -> Option<EarningsDate> {
    let raw = info.get("earningsTimestamp").filter(|v| !v.is_null())?;

    let converted = epoch_seconds(raw)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| EarningsDate::Date(dt.date_naive()));

    Some(converted.unwrap_or_else(|| {
        EarningsDate::Raw(match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }))
}

fn epoch_seconds(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
