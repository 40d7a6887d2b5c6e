//! Upstream source trait definitions.
//!
//! A [`TickerSource`] is one way of obtaining a connection handle for a
//! symbol; the [`Ticker`] it hands back performs the actual fetches.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{HistorySeries, Interval, Period, TickerInfo};

/// A connection handle bound to one symbol.
#[async_trait]
pub trait Ticker: Send + Sync {
    /// The symbol this handle was acquired for.
    fn symbol(&self) -> &str;

    /// Fetch the OHLCV series for `period` sampled every `interval`.
    ///
    /// Candles are ordered by timestamp ascending.
    async fn history(
        &self,
        period: Period,
        interval: Interval,
    ) -> Result<HistorySeries, MarketDataError>;

    /// Fetch the flat metadata mapping (names, prices, ratios).
    async fn info(&self) -> Result<TickerInfo, MarketDataError>;
}

/// Strategy for acquiring [`Ticker`] handles.
///
/// The client calls [`acquire`](Self::acquire) while holding its rate-limit
/// lock, so implementations may replace shared session state without further
/// coordination.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tickerlens_market_data::provider::{Ticker, TickerSource};
///
/// struct MySource;
///
/// #[async_trait]
/// impl TickerSource for MySource {
///     fn id(&self) -> &'static str {
///         "MY_SOURCE"
///     }
///
///     async fn acquire(&self, symbol: &str) -> Result<Arc<dyn Ticker>, MarketDataError> {
///         // ... open a session and bind it to `symbol`
///     }
/// }
/// ```
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Identifier used in logs, e.g. "YAHOO_SESSION".
    fn id(&self) -> &'static str;

    /// Obtain a handle for `symbol`.
    async fn acquire(&self, symbol: &str) -> Result<Arc<dyn Ticker>, MarketDataError>;

    /// Drop any shared session state so the next acquisition starts clean.
    ///
    /// Called after a transient failure. Default is a no-op for sources
    /// that keep no state between acquisitions.
    fn reset(&self) {}
}
