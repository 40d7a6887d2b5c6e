//! Ordered acquisition strategies wrapped in one retry/backoff policy.
//!
//! The usual plan is the pooled session with `max_retries` attempts followed
//! by a single attempt on a direct, unshared connection. Before attempts
//! 2..N of a strategy the loop waits a fixed backoff; moving on to the next
//! strategy does not wait. Every attempt passes through the rate limiter and
//! acquires its handle while holding it. The fetch itself runs after the
//! limiter has been released. Discarding a handle after a transient failure
//! takes the limiter lock again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::MarketDataConfig;
use crate::errors::{MarketDataError, RetryClass};
use crate::provider::{Ticker, TickerSource};

use super::rate_limiter::RateLimiter;

/// One strategy and its attempt budget.
#[derive(Clone)]
pub struct AcquisitionStep {
    pub source: Arc<dyn TickerSource>,
    pub attempts: u32,
}

/// Strategies tried in order until one yields a value.
#[derive(Clone)]
pub struct AcquisitionPlan {
    steps: Vec<AcquisitionStep>,
    backoff: Duration,
}

impl AcquisitionPlan {
    pub fn new(backoff: Duration) -> Self {
        Self {
            steps: Vec::new(),
            backoff,
        }
    }

    /// Append a strategy. A budget of zero is treated as one attempt.
    pub fn then(mut self, source: Arc<dyn TickerSource>, attempts: u32) -> Self {
        self.steps.push(AcquisitionStep {
            source,
            attempts: attempts.max(1),
        });
        self
    }

    /// Pooled strategy for `max_retries` attempts, then one fallback attempt.
    pub fn pooled_with_fallback(
        pooled: Arc<dyn TickerSource>,
        fallback: Arc<dyn TickerSource>,
        config: &MarketDataConfig,
    ) -> Self {
        Self::new(config.retry_backoff)
            .then(pooled, config.max_retries)
            .then(fallback, 1)
    }

    pub fn steps(&self) -> &[AcquisitionStep] {
        &self.steps
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn total_attempts(&self) -> u32 {
        self.steps.iter().map(|s| s.attempts).sum()
    }

    /// Acquire a ticker for `symbol` and run `fetch` on it, retrying
    /// transient failures according to the plan.
    ///
    /// Terminal errors ([`RetryClass::Never`]) return immediately. When every
    /// attempt has failed transiently the result is
    /// [`MarketDataError::Exhausted`] carrying the last failure.
    pub async fn run<T, F, Fut>(
        &self,
        symbol: &str,
        limiter: &RateLimiter,
        fetch: F,
    ) -> Result<T, MarketDataError>
    where
        F: Fn(Arc<dyn Ticker>) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let total = self.total_attempts();
        let mut attempts = 0u32;
        let mut last_error = None;

        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                info!(
                    "Falling back to {} for {}",
                    step.source.id(),
                    symbol
                );
            }

            for attempt in 0..step.attempts {
                if attempt > 0 {
                    info!(
                        "Retry attempt {} for {} via {}",
                        attempt,
                        symbol,
                        step.source.id()
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                attempts += 1;

                let acquired = {
                    let _slot = limiter.acquire().await;
                    step.source.acquire(symbol).await
                };
                let result = match acquired {
                    Ok(ticker) => fetch(ticker).await,
                    Err(e) => Err(e),
                };

                match result {
                    Ok(value) => return Ok(value),
                    Err(e) if e.retry_class() == RetryClass::Never => return Err(e),
                    Err(e) => {
                        error!(
                            "Error fetching {} via {} (attempt {}/{}): {}",
                            symbol,
                            step.source.id(),
                            attempts,
                            total,
                            e
                        );
                        {
                            let _lock = limiter.exclusive().await;
                            step.source.reset();
                        }
                        last_error = Some(e);
                    }
                }
            }
        }

        let last = last_error.unwrap_or_else(|| MarketDataError::Upstream {
            provider: "NONE".to_string(),
            message: "no acquisition strategy configured".to_string(),
        });
        error!("Giving up on {} after {} attempts: {}", symbol, attempts, last);
        Err(MarketDataError::Exhausted {
            symbol: symbol.to_string(),
            attempts,
            last: Box::new(last),
        })
    }
}
