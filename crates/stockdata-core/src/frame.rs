//! Conversions between typed rows and the polars frames handles exchange.
//!
//! Price frames have columns `date, open, high, low, close, volume`; dividend
//! frames have columns `date, amount`. Dates are stored as polars `Date`
//! (days since the Unix epoch).

use chrono::{Duration, NaiveDate};
use polars::prelude::*;

use crate::{
    error::{DataError, Result},
    types::{Dividend, PriceBar},
};

/// Builds a price frame from daily bars.
pub fn price_frame(bars: &[PriceBar]) -> Result<DataFrame> {
    let dates: Vec<i32> = bars.iter().map(|b| to_epoch_days(b.date)).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    let df = DataFrame::new(vec![
        date_column(dates)?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])?;

    Ok(df)
}

/// Builds a dividend frame from dividend payments.
pub fn dividend_frame(dividends: &[Dividend]) -> Result<DataFrame> {
    let dates: Vec<i32> = dividends.iter().map(|d| to_epoch_days(d.date)).collect();
    let amounts: Vec<f64> = dividends.iter().map(|d| d.amount).collect();

    let df = DataFrame::new(vec![
        date_column(dates)?,
        Column::new("amount".into(), amounts),
    ])?;

    Ok(df)
}

/// Reads daily bars back out of a price frame.
///
/// Fails with [`DataError::Frame`] if a column is missing, has an
/// incompatible type, or contains nulls.
pub fn price_bars(df: &DataFrame) -> Result<Vec<PriceBar>> {
    let dates = read_dates(df)?;
    let opens = df.column("open")?.f64()?;
    let highs = df.column("high")?.f64()?;
    let lows = df.column("low")?.f64()?;
    let closes = df.column("close")?.f64()?;
    let volumes = df.column("volume")?.cast(&DataType::UInt64)?;
    let volumes = volumes.u64()?;

    let mut bars = Vec::with_capacity(df.height());
    for (i, date) in dates.into_iter().enumerate() {
        bars.push(PriceBar {
            date,
            open: opens.get(i).ok_or_else(|| missing("open", i))?,
            high: highs.get(i).ok_or_else(|| missing("high", i))?,
            low: lows.get(i).ok_or_else(|| missing("low", i))?,
            close: closes.get(i).ok_or_else(|| missing("close", i))?,
            volume: volumes.get(i).ok_or_else(|| missing("volume", i))?,
        });
    }

    Ok(bars)
}

/// Reads dividend payments back out of a dividend frame.
pub fn dividends(df: &DataFrame) -> Result<Vec<Dividend>> {
    let dates = read_dates(df)?;
    let amounts = df.column("amount")?.f64()?;

    dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let amount = amounts.get(i).ok_or_else(|| missing("amount", i))?;
            Ok(Dividend::new(date, amount))
        })
        .collect()
}

fn date_column(days: Vec<i32>) -> Result<Column> {
    Ok(Column::new("date".into(), days).cast(&DataType::Date)?)
}

fn read_dates(df: &DataFrame) -> Result<Vec<NaiveDate>> {
    let days = df.column("date")?.cast(&DataType::Int32)?;
    let days = days.i32()?;

    days.into_iter()
        .enumerate()
        .map(|(i, d)| d.map(from_epoch_days).ok_or_else(|| missing("date", i)))
        .collect()
}

fn to_epoch_days(date: NaiveDate) -> i32 {
    // NaiveDate's default is 1970-01-01.
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}

fn from_epoch_days(days: i32) -> NaiveDate {
    NaiveDate::default() + Duration::days(i64::from(days))
}

fn missing(column: &str, row: usize) -> DataError {
    DataError::Frame(format!("null {column} at row {row}"))
}
