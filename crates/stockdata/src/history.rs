//! Lazy price history sequence.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::iter::FusedIterator;
use std::vec;
use stockdata_core::{Dividend, HistoricalPrice, PriceBar};

/// Daily prices for one history request, each carrying the dividend paid on
/// its date (`0.0` if none).
///
/// Records are built as the iterator is advanced. The sequence is finite,
/// ascending by date, and can only be consumed once.
#[derive(Debug)]
pub struct HistoryIter {
    bars: vec::IntoIter<PriceBar>,
    dividends: HashMap<NaiveDate, f64>,
}

impl HistoryIter {
    pub(crate) fn new(mut bars: Vec<PriceBar>, dividends: Vec<Dividend>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        Self {
            bars: bars.into_iter(),
            dividends: dividends.into_iter().map(|d| (d.date, d.amount)).collect(),
        }
    }
}

impl Iterator for HistoryIter {
    type Item = HistoricalPrice;

    fn next(&mut self) -> Option<Self::Item> {
        let bar = self.bars.next()?;
        let dividend = self.dividends.get(&bar.date).copied().unwrap_or(0.0);
        Some(HistoricalPrice::from_bar(&bar, dividend))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bars.size_hint()
    }
}

impl ExactSizeIterator for HistoryIter {}

impl FusedIterator for HistoryIter {}
