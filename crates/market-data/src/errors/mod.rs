//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines whether the client's retry loop repeats the attempt.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The caller supplied a missing symbol or an unknown period/interval.
    /// Rejected before any upstream interaction.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested symbol was not found by the provider.
    /// This is a terminal error - retrying won't help.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with an unexpected status or refused the session.
    #[error("Upstream error: {provider} - {message}")]
    Upstream {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered but the payload could not be read.
    #[error("Failed to decode {provider} response: {message}")]
    Decode {
        /// The provider whose payload was malformed
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// Every acquisition strategy was tried and all failed.
    /// This is the fatal error surfaced to callers; it is never cached.
    #[error("Upstream unavailable for {symbol} after {attempts} attempts: {last}")]
    Exhausted {
        /// The symbol being fetched
        symbol: String,
        /// Attempts made across all strategies
        attempts: u32,
        /// The error from the final attempt
        #[source]
        last: Box<MarketDataError>,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Shorthand for [`MarketDataError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerlens_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "YAHOO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidInput(_)
            | Self::SymbolNotFound(_)
            | Self::Decode { .. }
            | Self::Exhausted { .. } => RetryClass::Never,

            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Upstream { .. } => {
                RetryClass::Transient
            }

            // A body that fails to parse will fail the same way next time
            Self::Network(e) if e.is_decode() || e.is_builder() => RetryClass::Never,
            Self::Network(_) => RetryClass::Transient,
        }
    }

    /// True for the error raised once retries and fallback are spent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_never_retries() {
        let error = MarketDataError::invalid_input("Symbol parameter is required");
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_symbol_not_found_never_retries() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_decode_never_retries() {
        let error = MarketDataError::Decode {
            provider: "YAHOO".to_string(),
            message: "missing field `chart`".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_throttle_and_timeout_are_transient() {
        let error = MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Transient);

        let error = MarketDataError::Timeout {
            provider: "YAHOO".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn test_upstream_is_transient() {
        let error = MarketDataError::Upstream {
            provider: "YAHOO".to_string(),
            message: "HTTP 503 Service Unavailable".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn test_exhausted_is_fatal_and_terminal() {
        let error = MarketDataError::Exhausted {
            symbol: "AAPL".to_string(),
            attempts: 4,
            last: Box::new(MarketDataError::Timeout {
                provider: "YAHOO".to_string(),
            }),
        };
        assert!(error.is_fatal());
        assert_eq!(error.retry_class(), RetryClass::Never);
        assert!(!MarketDataError::SymbolNotFound("X".to_string()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: YAHOO");

        let error = MarketDataError::Exhausted {
            symbol: "MSFT".to_string(),
            attempts: 4,
            last: Box::new(MarketDataError::Upstream {
                provider: "YAHOO".to_string(),
                message: "HTTP 502 Bad Gateway".to_string(),
            }),
        };
        assert_eq!(
            format!("{}", error),
            "Upstream unavailable for MSFT after 4 attempts: Upstream error: YAHOO - HTTP 502 Bad Gateway"
        );
    }
}
