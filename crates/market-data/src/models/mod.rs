//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `params` - Request parameters (Period, Interval) and the history cache key
//! - `candle` - OHLCV bars and the history series built from them
//! - `info` - Ticker metadata (TickerInfo) and its quote projection (QuoteSummary)

mod candle;
mod info;
mod params;

pub use candle::{Candle, HistorySeries};
pub use info::{QuoteSummary, TickerInfo};
pub use params::{normalize_symbol, HistoryKey, Interval, Period};
