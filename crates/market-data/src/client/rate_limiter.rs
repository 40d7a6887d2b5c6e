//! Minimum-interval rate limiter shared by all outbound calls.
//!
//! One process-wide slot: a caller takes the lock, waits out whatever is
//! left of `min_interval` since the previous request, records its own start
//! time and keeps the lock until its guard is dropped. Two callers can never
//! compute their delay from the same stale timestamp.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::clock::Clock;

/// Limiter bookkeeping, only touched while the lock is held.
#[derive(Debug)]
pub struct RateLimiterState {
    /// Start of the most recent outbound request.
    pub last_request_time: Option<Instant>,
    /// Minimum gap between two request starts.
    pub min_interval: Duration,
}

impl RateLimiterState {
    /// How long a request starting at `now` still has to wait.
    fn wait_time(&self, now: Instant) -> Duration {
        match self.last_request_time {
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

/// Serializes outbound requests regardless of symbol.
pub struct RateLimiter {
    state: Mutex<RateLimiterState>,
    clock: Arc<dyn Clock>,
}

/// Proof of a granted request slot. The limiter stays locked until it drops.
#[must_use]
pub struct RateLimitGuard<'a> {
    state: MutexGuard<'a, RateLimiterState>,
}

impl RateLimitGuard<'_> {
    /// When this slot was granted.
    pub fn started_at(&self) -> Option<Instant> {
        self.state.last_request_time
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(RateLimiterState {
                last_request_time: None,
                min_interval,
            }),
            clock,
        }
    }

    /// Wait for the next request slot.
    ///
    /// The wait happens while holding the lock, so concurrent callers queue
    /// behind each other in arrival order.
    pub async fn acquire(&self) -> RateLimitGuard<'_> {
        let mut state = self.state.lock().await;

        let wait_time = state.wait_time(self.clock.now());
        if wait_time > Duration::ZERO {
            debug!("Rate limiting: sleeping for {:?}", wait_time);
            tokio::time::sleep(wait_time).await;
        }

        state.last_request_time = Some(self.clock.now());
        RateLimitGuard { state }
    }

    /// Take the limiter lock without consuming a request slot.
    ///
    /// Used to replace connection handles, which must not race with a caller
    /// acquiring through the limiter.
    pub async fn exclusive(&self) -> RateLimitGuard<'_> {
        RateLimitGuard {
            state: self.state.lock().await,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.state.try_lock().is_err()
    }

    /// Start of the most recent request, if any.
    pub async fn last_request_time(&self) -> Option<Instant> {
        self.state.lock().await.last_request_time
    }
}
