//! Price domain - historical series, snapshots, band calculation and breach detection

mod band_calculator;
mod breach_detector;

pub use band_calculator::compute_band;
pub use breach_detector::{detect_breaches, AlertEvent};

use crate::shared::errors::BandError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One validated `(timestamp, value)` sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Historical series for one asset, as delivered by the feed.
///
/// Rows are kept as received; shape checks happen when the series is walked
/// through [`PriceSeries::points`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    rows: Vec<Vec<f64>>,
}

impl PriceSeries {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Build a series from `(unix millis, value)` pairs
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        Self {
            rows: pairs
                .into_iter()
                .map(|(ts, value)| vec![ts as f64, value])
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Walk the series, validating each row as a `[timestamp, value]` pair
    pub fn points(&self) -> impl Iterator<Item = Result<PricePoint, BandError>> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| parse_row(index, row))
    }
}

fn parse_row(index: usize, row: &[f64]) -> Result<PricePoint, BandError> {
    let malformed = |reason: String| BandError::MalformedData { index, reason };

    let (ts, value) = match row {
        [ts, value] => (*ts, *value),
        _ => {
            return Err(malformed(format!(
                "expected [timestamp, value], got {} elements",
                row.len()
            )))
        }
    };

    if !value.is_finite() {
        return Err(malformed(format!("non-finite value {}", value)));
    }

    let timestamp = Some(ts)
        .filter(|ts| ts.is_finite())
        .and_then(|ts| DateTime::<Utc>::from_timestamp_millis(ts as i64))
        .ok_or_else(|| malformed(format!("invalid timestamp {}", ts)))?;

    Ok(PricePoint { timestamp, value })
}

/// Result of looking up one asset in a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuoteLookup {
    Price(f64),
    Missing,
    Malformed,
}

/// Point-in-time prices keyed by asset id, in one reference currency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    currency: String,
    // `None` marks an entry the feed returned without a usable price
    quotes: BTreeMap<String, Option<f64>>,
}

impl PriceSnapshot {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            quotes: BTreeMap::new(),
        }
    }

    pub fn with_price(mut self, id: impl Into<String>, price: f64) -> Self {
        self.insert(id, Some(price));
        self
    }

    pub fn with_malformed(mut self, id: impl Into<String>) -> Self {
        self.insert(id, None);
        self
    }

    /// Non-finite prices are stored as malformed entries.
    pub fn insert(&mut self, id: impl Into<String>, price: Option<f64>) {
        self.quotes
            .insert(id.into(), price.filter(|p| p.is_finite()));
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn lookup(&self, id: &str) -> QuoteLookup {
        match self.quotes.get(id) {
            Some(Some(price)) => QuoteLookup::Price(*price),
            Some(None) => QuoteLookup::Malformed,
            None => QuoteLookup::Missing,
        }
    }

    /// Well-formed prices in ascending id order
    pub fn prices(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.quotes
            .iter()
            .filter_map(|(id, price)| price.map(|p| (id.as_str(), p)))
    }
}
