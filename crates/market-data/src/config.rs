//! Tuning knobs for [`MarketDataClient`](crate::MarketDataClient).

use std::time::Duration;

/// Default minimum gap between two outbound requests.
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(200);

/// Default lifetime of a cached history series or info mapping.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default number of attempts on the pooled session before falling back.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fixed (non-exponential) wait before each retry attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Per-request timeout handed to the HTTP transport.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Market data client configuration.
///
/// One TTL covers both the history and the info cache; there is no
/// per-entry override.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketDataConfig {
    /// Minimum wall-clock gap between consecutive outbound requests.
    pub min_request_interval: Duration,
    /// How long a cached response stays servable.
    pub cache_ttl: Duration,
    /// Attempts on the pooled session before the fallback strategy runs.
    pub max_retries: u32,
    /// Wait inserted before attempts 2..N of a strategy.
    pub retry_backoff: Duration,
    /// Transport timeout for a single HTTP request.
    pub request_timeout: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl MarketDataConfig {
    /// Set the minimum request interval.
    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the pooled-session attempt budget. Zero is treated as one.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the wait between retry attempts.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the transport timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
