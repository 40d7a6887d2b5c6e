//! Yahoo Finance upstream.
//!
//! Two acquisition strategies share the same ticker implementation:
//! - [`YahooSessionSource`] keeps one pooled session (HTTP client, cookie and
//!   crumb) and hands every symbol a ticker bound to it.
//! - [`YahooDirectSource`] builds a fresh, unshared session per acquisition.
//!   It is the fallback once the pooled session has used up its retries.
//!
//! Both present the same browser headers on every request.

mod models;

use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{header, Response, StatusCode};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{Candle, HistorySeries, Interval, Period, TickerInfo};
use crate::provider::headers::browser_headers;
use crate::provider::{Ticker, TickerSource};

use models::{flatten_modules, YahooChartResponse, YahooQuoteColumns, YahooQuoteSummaryResponse};

const PROVIDER_ID: &str = "YAHOO";

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";
const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// quoteSummary modules merged into `TickerInfo`, in precedence order.
const INFO_MODULES: [&str; 4] = ["price", "summaryDetail", "defaultKeyStatistics", "assetProfile"];

// ============================================================================
// Session
// ============================================================================

/// An HTTP client plus the cookie/crumb pair quoteSummary requires.
#[derive(Clone, Debug)]
struct YahooSession {
    client: reqwest::Client,
    cookie: Option<String>,
    crumb: String,
}

impl YahooSession {
    /// Build a client and run the cookie/crumb handshake.
    async fn connect(timeout: Duration) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()?;

        // fc.yahoo.com answers 404 but still sets the cookie we need
        let response = client.get(COOKIE_URL).send().await.map_err(transport_error)?;
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()));
        if cookie.is_none() {
            debug!("Yahoo did not set a session cookie, continuing without one");
        }

        let mut request = client.get(CRUMB_URL);
        if let Some(cookie) = &cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = request.send().await.map_err(transport_error)?;
        let crumb = check_handshake_status(response)?
            .text()
            .await
            .map_err(transport_error)?
            .trim()
            .to_string();

        if crumb.is_empty() || crumb.contains('<') {
            return Err(MarketDataError::Upstream {
                provider: PROVIDER_ID.to_string(),
                message: "Yahoo returned an invalid crumb".to_string(),
            });
        }

        Ok(Self {
            client,
            cookie,
            crumb,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        }
    }
}

// ============================================================================
// Ticker
// ============================================================================

/// Yahoo ticker bound to a session.
pub struct YahooTicker {
    symbol: String,
    session: YahooSession,
}

#[async_trait]
impl Ticker for YahooTicker {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn history(
        &self,
        period: Period,
        interval: Interval,
    ) -> Result<HistorySeries, MarketDataError> {
        debug!(
            "Fetching {} history for {} at {} from Yahoo",
            period, self.symbol, interval
        );

        let url = format!(
            "{}/{}?range={}&interval={}&includePrePost=false",
            CHART_URL,
            encode(&self.symbol),
            period,
            interval
        );
        let response = self.session.get(&url).send().await.map_err(transport_error)?;
        let response = check_status(response, &self.symbol)?;

        let data: YahooChartResponse = response.json().await.map_err(decode_error)?;
        if let Some(error) = data.chart.error {
            return Err(if error.is_not_found() {
                MarketDataError::SymbolNotFound(self.symbol.clone())
            } else {
                MarketDataError::Upstream {
                    provider: PROVIDER_ID.to_string(),
                    message: error.message(),
                }
            });
        }

        let result = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| MarketDataError::SymbolNotFound(self.symbol.clone()))?;
        let columns = result.indicators.quote.into_iter().next().unwrap_or_default();

        let candles = to_candles(&result.timestamp, &columns);
        Ok(HistorySeries::new(&self.symbol, period, interval).with_candles(candles))
    }

    async fn info(&self) -> Result<TickerInfo, MarketDataError> {
        debug!("Fetching info for {} from Yahoo", self.symbol);

        let url = format!(
            "{}/{}?modules={}&crumb={}",
            QUOTE_SUMMARY_URL,
            encode(&self.symbol),
            INFO_MODULES.join(","),
            encode(&self.session.crumb)
        );
        let response = self.session.get(&url).send().await.map_err(transport_error)?;
        let response = check_status(response, &self.symbol)?;

        let data: YahooQuoteSummaryResponse = response.json().await.map_err(decode_error)?;
        if let Some(error) = data.quote_summary.error {
            return Err(if error.is_not_found() {
                MarketDataError::SymbolNotFound(self.symbol.clone())
            } else {
                MarketDataError::Upstream {
                    provider: PROVIDER_ID.to_string(),
                    message: error.message(),
                }
            });
        }

        let result = data
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| MarketDataError::SymbolNotFound(self.symbol.clone()))?;

        Ok(TickerInfo::new(flatten_modules(&result, &INFO_MODULES)))
    }
}

// ============================================================================
// Acquisition strategies
// ============================================================================

/// Pooled strategy: one shared session, rebuilt only after [`reset`](TickerSource::reset).
pub struct YahooSessionSource {
    timeout: Duration,
    session: RwLock<Option<YahooSession>>,
}

impl YahooSessionSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            session: RwLock::new(None),
        }
    }

    fn lock_session(&self) -> RwLockWriteGuard<'_, Option<YahooSession>> {
        self.session.write().unwrap_or_else(|poisoned| {
            warn!("Yahoo session lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn current(&self) -> Option<YahooSession> {
        self.session
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl TickerSource for YahooSessionSource {
    fn id(&self) -> &'static str {
        "YAHOO_SESSION"
    }

    async fn acquire(&self, symbol: &str) -> Result<Arc<dyn Ticker>, MarketDataError> {
        let session = match self.current() {
            Some(session) => session,
            None => {
                let session = YahooSession::connect(self.timeout).await?;
                *self.lock_session() = Some(session.clone());
                info!("Created new Yahoo Finance session with browser headers");
                session
            }
        };

        Ok(Arc::new(YahooTicker {
            symbol: symbol.to_string(),
            session,
        }))
    }

    fn reset(&self) {
        if self.lock_session().take().is_some() {
            debug!("Discarded pooled Yahoo session");
        }
    }
}

/// Fallback strategy: a fresh session per acquisition, never stored.
pub struct YahooDirectSource {
    timeout: Duration,
}

impl YahooDirectSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TickerSource for YahooDirectSource {
    fn id(&self) -> &'static str {
        "YAHOO_DIRECT"
    }

    async fn acquire(&self, symbol: &str) -> Result<Arc<dyn Ticker>, MarketDataError> {
        let session = YahooSession::connect(self.timeout).await?;
        Ok(Arc::new(YahooTicker {
            symbol: symbol.to_string(),
            session,
        }))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn transport_error(e: reqwest::Error) -> MarketDataError {
    if e.is_timeout() {
        MarketDataError::Timeout {
            provider: PROVIDER_ID.to_string(),
        }
    } else {
        MarketDataError::Network(e)
    }
}

fn decode_error(e: reqwest::Error) -> MarketDataError {
    MarketDataError::Decode {
        provider: PROVIDER_ID.to_string(),
        message: e.to_string(),
    }
}

/// Map non-success statuses of a data endpoint onto the error taxonomy.
fn check_status(response: Response, symbol: &str) -> Result<Response, MarketDataError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        status => Err(status_error(status, Some(symbol))),
    }
}

/// Like [`check_status`] for the cookie/crumb handshake. A handshake failure
/// says nothing about the symbol, so it stays retryable.
fn check_handshake_status(response: Response) -> Result<Response, MarketDataError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        status => Err(status_error(status, None)),
    }
}

fn status_error(status: StatusCode, symbol: Option<&str>) -> MarketDataError {
    match (status, symbol) {
        (StatusCode::TOO_MANY_REQUESTS, _) => MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        },
        (StatusCode::NOT_FOUND, Some(symbol)) => MarketDataError::SymbolNotFound(symbol.to_string()),
        (status, None) => MarketDataError::Upstream {
            provider: PROVIDER_ID.to_string(),
            message: format!("crumb handshake failed: HTTP {}", status),
        },
        (status, Some(_)) => MarketDataError::Upstream {
            provider: PROVIDER_ID.to_string(),
            message: format!("HTTP {}", status),
        },
    }
}

/// Zip the column arrays into candles, dropping bars with no prices.
fn to_candles(timestamps: &[i64], columns: &YahooQuoteColumns) -> Vec<Candle> {
    let price = |column: &[Option<f64>], i: usize| {
        column
            .get(i)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
            .and_then(Decimal::from_f64_retain)
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let timestamp = match Utc.timestamp_opt(*ts, 0).single() {
                Some(t) => t,
                None => {
                    warn!("Skipping bar with invalid timestamp: {}", ts);
                    return None;
                }
            };
            let candle = Candle {
                timestamp,
                open: price(&columns.open, i),
                high: price(&columns.high, i),
                low: price(&columns.low, i),
                close: price(&columns.close, i),
                volume: columns.volume.get(i).copied().flatten(),
            };
            (!candle.is_empty()).then_some(candle)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RetryClass;

    #[test]
    fn test_data_endpoint_404_is_unknown_symbol() {
        let err = status_error(StatusCode::NOT_FOUND, Some("NOPE"));
        assert!(matches!(err, MarketDataError::SymbolNotFound(ref s) if s == "NOPE"));
        assert_eq!(err.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_handshake_failures_stay_retryable() {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::UNAUTHORIZED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let err = status_error(status, None);
            assert!(matches!(err, MarketDataError::Upstream { .. }), "{status}");
            assert_eq!(err.retry_class(), RetryClass::Transient);
        }

        let throttled = status_error(StatusCode::TOO_MANY_REQUESTS, None);
        assert!(matches!(throttled, MarketDataError::RateLimited { .. }));
    }

    #[test]
    fn test_to_candles_aligns_columns() {
        let columns = YahooQuoteColumns {
            open: vec![Some(10.0), Some(11.0)],
            high: vec![Some(12.0), Some(13.0)],
            low: vec![Some(9.0), Some(10.5)],
            close: vec![Some(11.0), Some(12.5)],
            volume: vec![Some(100), Some(200)],
        };
        let candles = to_candles(&[1_700_000_000, 1_700_086_400], &columns);

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].timestamp.timestamp(), 1_700_086_400);
        assert_eq!(candles[1].close, Decimal::from_f64_retain(12.5));
        assert_eq!(candles[1].volume, Some(200));
    }

    #[test]
    fn test_to_candles_drops_empty_bars() {
        let columns = YahooQuoteColumns {
            open: vec![None, Some(1.0)],
            high: vec![None, Some(1.0)],
            low: vec![None, Some(1.0)],
            close: vec![None, Some(1.0)],
            volume: vec![Some(0), None],
        };
        let candles = to_candles(&[1, 2], &columns);

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp.timestamp(), 2);
        assert_eq!(candles[0].volume, None);
    }

    #[test]
    fn test_to_candles_tolerates_short_columns() {
        let columns = YahooQuoteColumns {
            close: vec![Some(5.0)],
            ..Default::default()
        };
        let candles = to_candles(&[1, 2, 3], &columns);

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open, None);
        assert_eq!(candles[0].close, Decimal::from_f64_retain(5.0));
    }

    #[test]
    fn test_to_candles_skips_nan() {
        let columns = YahooQuoteColumns {
            close: vec![Some(f64::NAN)],
            ..Default::default()
        };
        assert!(to_candles(&[1], &columns).is_empty());
    }

    #[test]
    fn test_source_ids() {
        let pooled = YahooSessionSource::new(Duration::from_secs(5));
        let direct = YahooDirectSource::new(Duration::from_secs(5));
        assert_eq!(pooled.id(), "YAHOO_SESSION");
        assert_eq!(direct.id(), "YAHOO_DIRECT");
    }

    #[test]
    fn test_reset_without_session_is_harmless() {
        let pooled = YahooSessionSource::new(Duration::from_secs(5));
        pooled.reset();
        assert!(pooled.current().is_none());
    }
}
