//! The caching, rate-limited market data client.
//!
//! Per request: `CHECK_CACHE -> (HIT: return) | (MISS: RATE_LIMIT_WAIT ->
//! ACQUIRE_CONNECTION [retry loop] -> FETCH -> STORE -> return)`.
//!
//! Misses on the same key are single-flight: the first caller fetches while
//! the others wait on that key's lock and then read the fresh entry.

mod rate_limiter;
mod retry;
mod single_flight;

pub use rate_limiter::{RateLimitGuard, RateLimiter, RateLimiterState};
pub use retry::{AcquisitionPlan, AcquisitionStep};
pub use single_flight::KeyedLocks;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::clock::{Clock, TokioClock};
use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{normalize_symbol, HistoryKey, HistorySeries, Interval, Period, TickerInfo};
use crate::provider::yahoo::{YahooDirectSource, YahooSessionSource};
use crate::provider::TickerSource;

/// Rate-limited, retrying, TTL-caching façade over a market data source.
///
/// Create one per process and share it (usually behind an `Arc`).
pub struct MarketDataClient {
    config: MarketDataConfig,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    plan: AcquisitionPlan,
    history_cache: TtlCache<HistoryKey, HistorySeries>,
    info_cache: TtlCache<String, TickerInfo>,
    history_flights: KeyedLocks<HistoryKey>,
    info_flights: KeyedLocks<String>,
}

impl MarketDataClient {
    /// Client over an explicit acquisition plan, using tokio's clock.
    pub fn new(config: MarketDataConfig, plan: AcquisitionPlan) -> Self {
        Self::with_clock(config, plan, Arc::new(TokioClock))
    }

    pub fn with_clock(
        config: MarketDataConfig,
        plan: AcquisitionPlan,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            "Market data client initialized (min interval {:?}, ttl {:?}, {} attempts)",
            config.min_request_interval,
            config.cache_ttl,
            plan.total_attempts()
        );
        Self {
            limiter: RateLimiter::new(config.min_request_interval, clock.clone()),
            history_cache: TtlCache::new(config.cache_ttl),
            info_cache: TtlCache::new(config.cache_ttl),
            history_flights: KeyedLocks::new(),
            info_flights: KeyedLocks::new(),
            config,
            clock,
            plan,
        }
    }

    /// Pooled source for `max_retries` attempts, then `fallback` once.
    pub fn from_sources(
        config: MarketDataConfig,
        pooled: Arc<dyn TickerSource>,
        fallback: Arc<dyn TickerSource>,
    ) -> Self {
        let plan = AcquisitionPlan::pooled_with_fallback(pooled, fallback, &config);
        Self::new(config, plan)
    }

    /// Client backed by Yahoo Finance.
    pub fn yahoo(config: MarketDataConfig) -> Self {
        let pooled = Arc::new(YahooSessionSource::new(config.request_timeout));
        let fallback = Arc::new(YahooDirectSource::new(config.request_timeout));
        Self::from_sources(config, pooled, fallback)
    }

    pub fn config(&self) -> &MarketDataConfig {
        &self.config
    }

    pub fn history_cache(&self) -> &TtlCache<HistoryKey, HistorySeries> {
        &self.history_cache
    }

    pub fn info_cache(&self) -> &TtlCache<String, TickerInfo> {
        &self.info_cache
    }

    /// Historical OHLCV series for `symbol`.
    ///
    /// Empty symbols are rejected before any upstream interaction.
    pub async fn get_history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Arc<HistorySeries>, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;
        let key = HistoryKey::new(symbol, period, interval);

        if let Some(series) = self.history_cache.get(&key, self.clock.now()) {
            info!("Using cached history data for {}", key);
            return Ok(series);
        }

        let _flight = self.history_flights.lock(&key).await;
        // Filled by another caller while we waited
        if let Some(series) = self.history_cache.get(&key, self.clock.now()) {
            debug!("History for {} was fetched by a concurrent caller", key);
            return Ok(series);
        }

        let series = self
            .plan
            .run(&key.symbol, &self.limiter, |ticker| async move {
                ticker.history(period, interval).await
            })
            .await?;

        let series = Arc::new(series);
        info!("Fetched {} data points for {}", series.len(), key);
        self.history_cache
            .insert(key, Arc::clone(&series), self.clock.now());
        Ok(series)
    }

    /// Metadata mapping for `symbol`.
    pub async fn get_info(&self, symbol: &str) -> Result<Arc<TickerInfo>, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(info) = self.info_cache.get(&symbol, self.clock.now()) {
            info!("Using cached info data for {}", symbol);
            return Ok(info);
        }

        let _flight = self.info_flights.lock(&symbol).await;
        if let Some(info) = self.info_cache.get(&symbol, self.clock.now()) {
            debug!("Info for {} was fetched by a concurrent caller", symbol);
            return Ok(info);
        }

        let info = self
            .plan
            .run(&symbol, &self.limiter, |ticker| async move { ticker.info().await })
            .await?;

        let info = Arc::new(info);
        info!("Fetched info for {} with {} fields", symbol, info.len());
        self.info_cache
            .insert(symbol, Arc::clone(&info), self.clock.now());
        Ok(info)
    }
}
