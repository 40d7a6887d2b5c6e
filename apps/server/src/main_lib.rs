use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use tickerlens_market_data::MarketDataClient;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    /// The one market data client for the process; its limiter and caches
    /// are shared by every request.
    pub market_data: Arc<MarketDataClient>,
    /// Upper bound on a single client call made by a handler.
    pub upstream_deadline: Duration,
}

impl AppState {
    pub fn new(market_data: Arc<MarketDataClient>, upstream_deadline: Duration) -> Arc<Self> {
        Arc::new(Self {
            market_data,
            upstream_deadline,
        })
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("TL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let market_data = MarketDataClient::yahoo(config.market_data.clone());
    tracing::info!(
        "Yahoo Finance client ready (interval {:?}, ttl {:?}, max retries {})",
        config.market_data.min_request_interval,
        config.market_data.cache_ttl,
        config.market_data.max_retries
    );
    AppState::new(Arc::new(market_data), config.upstream_deadline())
}
