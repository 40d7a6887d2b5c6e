//! Tickerlens Market Data Crate
//!
//! A rate-limited, retrying, TTL-caching client over a remote quote/history
//! source (Yahoo Finance).
//!
//! # Overview
//!
//! - One process-wide rate limiter spaces every outbound request by at least
//!   `min_request_interval`.
//! - Connection acquisition is retried with a fixed backoff on the pooled
//!   session, then tried once more on a direct connection.
//! - History and info responses are cached in two separate maps with a
//!   shared TTL. Errors are never cached.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! | MarketDataClient |  get_history / get_info
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |    TtlCache      |  hit: return, no side effects
//! +------------------+
//!          | miss
//!          v
//! +------------------+
//! |   RateLimiter    |  one global slot, min interval
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | AcquisitionPlan  |  pooled x max_retries, then direct x 1
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  Ticker (Yahoo)  |  chart / quoteSummary
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataClient`] - The caching façade
//! - [`MarketDataConfig`] - Interval, TTL and retry settings
//! - [`HistorySeries`] / [`Candle`] - OHLCV data
//! - [`TickerInfo`] / [`QuoteSummary`] - Ticker metadata
//! - [`Period`] / [`Interval`] - Validated request parameters

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod provider;

pub use cache::{CacheEntry, TtlCache};
pub use client::{AcquisitionPlan, AcquisitionStep, MarketDataClient, RateLimiter};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::MarketDataConfig;
pub use errors::{MarketDataError, RetryClass};
pub use models::{
    normalize_symbol, Candle, HistoryKey, HistorySeries, Interval, Period, QuoteSummary,
    TickerInfo,
};
pub use provider::yahoo::{YahooDirectSource, YahooSessionSource};
pub use provider::{Ticker, TickerSource};
