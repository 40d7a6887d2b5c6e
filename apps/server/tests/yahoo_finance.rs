use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::{json, Map, Value};
use tickerlens_market_data::{
    Candle, HistorySeries, Interval, MarketDataClient, MarketDataConfig, MarketDataError, Period,
    Ticker, TickerInfo, TickerSource,
};
use tickerlens_server::{api::app_router, config::Config, AppState};
use tower::ServiceExt;

#[derive(Clone, Copy)]
enum Behavior {
    Healthy,
    Down,
    Unknown,
    Hang,
}

struct FakeSource {
    behavior: Behavior,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl TickerSource for FakeSource {
    fn id(&self) -> &'static str {
        "FAKE"
    }

    async fn acquire(&self, symbol: &str) -> Result<Arc<dyn Ticker>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Healthy => Ok(Arc::new(FakeTicker(symbol.to_string()))),
            Behavior::Down => Err(MarketDataError::Timeout {
                provider: "FAKE".to_string(),
            }),
            Behavior::Unknown => Err(MarketDataError::SymbolNotFound(symbol.to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Arc::new(FakeTicker(symbol.to_string())))
            }
        }
    }
}

struct FakeTicker(String);

#[async_trait]
impl Ticker for FakeTicker {
    fn symbol(&self) -> &str {
        &self.0
    }

    async fn history(
        &self,
        period: Period,
        interval: Interval,
    ) -> Result<HistorySeries, MarketDataError> {
        let bars = (0..3)
            .map(|i| {
                Candle::ohlcv(
                    Utc.timestamp_opt(1_700_000_000 + i * 86_400, 0).unwrap(),
                    dec!(100),
                    dec!(110),
                    dec!(95),
                    dec!(105.5),
                    1_000,
                )
            })
            .collect();
        Ok(HistorySeries::new(&self.0, period, interval).with_candles(bars))
    }

    async fn info(&self) -> Result<TickerInfo, MarketDataError> {
        let mut fields = Map::new();
        fields.insert("shortName".to_string(), json!("Apple Inc."));
        fields.insert("regularMarketPrice".to_string(), json!(189.5));
        fields.insert("marketCap".to_string(), json!(2_950_000_000_000u64));
        fields.insert("trailingPE".to_string(), json!(29.1));
        Ok(TickerInfo::new(fields))
    }
}

fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        cors_allow: vec!["*".to_string()],
        request_timeout: Duration::from_secs(30),
        market_data: MarketDataConfig::default()
            .with_min_request_interval(Duration::from_millis(1))
            .with_retry_backoff(Duration::from_millis(1)),
    }
}

fn app(behavior: Behavior) -> (Router, Arc<AtomicU32>) {
    let config = test_config();
    let calls = Arc::new(AtomicU32::new(0));
    let source = || {
        Arc::new(FakeSource {
            behavior,
            calls: calls.clone(),
        })
    };
    let client = MarketDataClient::from_sources(config.market_data.clone(), source(), source());
    let state = AppState::new(Arc::new(client), config.upstream_deadline());
    (app_router(state, &config), calls)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn chart_returns_columnar_series() {
    let (app, _) = app(Behavior::Healthy);

    let (status, body) = get(&app, "/api/yahoo-finance/chart?symbol=AAPL&period=1y&interval=1d").await;

    assert_eq!(status, StatusCode::OK);
    let result = &body["chart"]["result"][0];
    assert_eq!(result["meta"]["symbol"], "AAPL");
    assert_eq!(result["meta"]["period"], "1y");
    assert_eq!(result["meta"]["interval"], "1d");
    assert_eq!(
        result["timestamp"],
        json!([1_700_000_000, 1_700_086_400, 1_700_172_800])
    );
    let quote = &result["indicators"]["quote"][0];
    assert_eq!(quote["close"], json!([105.5, 105.5, 105.5]));
    assert_eq!(quote["volume"], json!([1000, 1000, 1000]));
}

#[tokio::test]
async fn chart_defaults_to_ten_years_monthly() {
    let (app, _) = app(Behavior::Healthy);

    let (status, body) = get(&app, "/api/yahoo-finance/chart?symbol=MSFT").await;

    assert_eq!(status, StatusCode::OK);
    let meta = &body["chart"]["result"][0]["meta"];
    assert_eq!(meta["period"], "10y");
    assert_eq!(meta["interval"], "1mo");
}

#[tokio::test]
async fn repeated_chart_requests_hit_the_cache() {
    let (app, calls) = app(Behavior::Healthy);

    let (first_status, first) = get(&app, "/api/yahoo-finance/chart?symbol=AAPL").await;
    let (second_status, second) = get(&app, "/api/yahoo-finance/chart?symbol=AAPL").await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_symbol_is_bad_request() {
    let (app, calls) = app(Behavior::Healthy);

    for uri in [
        "/api/yahoo-finance/chart",
        "/api/yahoo-finance/chart?symbol=",
        "/api/yahoo-finance/quote?symbol=%20",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({ "error": "Symbol parameter is required" }));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_period_is_bad_request() {
    let (app, calls) = app(Behavior::Healthy);

    let (status, body) = get(&app, "/api/yahoo-finance/chart?symbol=AAPL&period=7y").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported period: 7y");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn quote_projects_known_fields() {
    let (app, _) = app(Behavior::Healthy);

    let (status, body) = get(&app, "/api/yahoo-finance/quote?symbol=AAPL").await;

    assert_eq!(status, StatusCode::OK);
    let quote = &body["quoteResponse"]["result"][0];
    assert_eq!(quote["symbol"], "AAPL");
    assert_eq!(quote["shortName"], "Apple Inc.");
    assert_eq!(quote["regularMarketPrice"], 189.5);
    assert_eq!(quote["marketCap"], 2_950_000_000_000u64);
    assert_eq!(quote["trailingPE"], 29.1);
    // Absent upstream fields are null, not errors
    assert_eq!(quote["dividendYield"], Value::Null);
    assert_eq!(quote["longName"], Value::Null);
}

#[tokio::test]
async fn upstream_outage_is_server_error() {
    let (app, calls) = app(Behavior::Down);

    let (status, body) = get(&app, "/api/yahoo-finance/quote?symbol=AAPL").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("AAPL"), "{message}");
    // three pooled attempts plus the direct fallback
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn unknown_symbol_is_not_found() {
    let (app, calls) = app(Behavior::Unknown);

    let (status, body) = get(&app, "/api/yahoo-finance/chart?symbol=NOPE").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Symbol not found: NOPE");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_upstream_is_json_server_error() {
    let (app, _) = app(Behavior::Hang);

    let (status, body) = get(&app, "/api/yahoo-finance/quote?symbol=AAPL").await;

    // The handler deadline (27s) fires before the 30s HTTP timeout
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Upstream did not answer within 27s");
}
