use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::params::{Interval, Period};

/// One OHLCV bar.
///
/// Prices are optional because Yahoo leaves gaps (`null`) in sparse series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Start of the bar
    pub timestamp: DateTime<Utc>,

    pub open: Option<Decimal>,

    pub high: Option<Decimal>,

    pub low: Option<Decimal>,

    pub close: Option<Decimal>,

    /// Traded volume (absent for FX and some indices)
    pub volume: Option<u64>,
}

impl Candle {
    /// Create a full OHLCV bar
    pub fn ohlcv(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// A bar with no prices carries no information.
    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.high.is_none() && self.low.is_none() && self.close.is_none()
    }
}

/// Time-ordered history for one `(symbol, period, interval)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
    pub candles: Vec<Candle>,
}

impl HistorySeries {
    pub fn new(symbol: impl Into<String>, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            interval,
            candles: Vec::new(),
        }
    }

    pub fn with_candles(mut self, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        self.candles = candles;
        self
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Bar start times as unix seconds.
    pub fn timestamps(&self) -> Vec<i64> {
        self.candles.iter().map(|c| c.timestamp.timestamp()).collect()
    }

    pub fn opens(&self) -> Vec<Option<Decimal>> {
        self.candles.iter().map(|c| c.open).collect()
    }

    pub fn highs(&self) -> Vec<Option<Decimal>> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<Option<Decimal>> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<Option<Decimal>> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<Option<u64>> {
        self.candles.iter().map(|c| c.volume).collect()
    }
}
