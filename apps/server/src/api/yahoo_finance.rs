use std::future::Future;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tickerlens_market_data::{
    normalize_symbol, HistorySeries, Interval, MarketDataError, Period, QuoteSummary,
};

#[derive(Deserialize)]
struct ChartQuery {
    symbol: Option<String>,
    period: Option<String>,
    interval: Option<String>,
}

#[derive(Deserialize)]
struct QuoteQuery {
    symbol: Option<String>,
}

// Response shapes follow Yahoo's chart and quote payloads.

#[derive(Serialize)]
pub struct ChartResponse {
    pub chart: ChartBody,
}

#[derive(Serialize)]
pub struct ChartBody {
    pub result: Vec<ChartResult>,
}

#[derive(Serialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Serialize)]
pub struct ChartMeta {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
}

#[derive(Serialize)]
pub struct ChartIndicators {
    pub quote: Vec<ChartQuote>,
}

#[derive(Serialize)]
pub struct ChartQuote {
    pub open: Vec<Option<Decimal>>,
    pub high: Vec<Option<Decimal>>,
    pub low: Vec<Option<Decimal>>,
    pub close: Vec<Option<Decimal>>,
    pub volume: Vec<Option<u64>>,
}

impl From<&HistorySeries> for ChartResponse {
    fn from(series: &HistorySeries) -> Self {
        ChartResponse {
            chart: ChartBody {
                result: vec![ChartResult {
                    meta: ChartMeta {
                        symbol: series.symbol.clone(),
                        period: series.period,
                        interval: series.interval,
                    },
                    timestamp: series.timestamps(),
                    indicators: ChartIndicators {
                        quote: vec![ChartQuote {
                            open: series.opens(),
                            high: series.highs(),
                            low: series.lows(),
                            close: series.closes(),
                            volume: series.volumes(),
                        }],
                    },
                }],
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub quote_response: QuoteBody,
}

#[derive(Serialize)]
pub struct QuoteBody {
    pub result: Vec<QuoteSummary>,
}

/// Parse an optional query value, falling back to the parameter's default.
fn parse_or_default<T>(raw: Option<&str>) -> ApiResult<T>
where
    T: std::str::FromStr<Err = MarketDataError> + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => Ok(value.parse::<T>()?),
        None => Ok(T::default()),
    }
}

/// Run a client call, giving up once the state's upstream deadline passes.
async fn within_deadline<T>(
    state: &AppState,
    call: impl Future<Output = Result<T, MarketDataError>>,
) -> ApiResult<T> {
    match tokio::time::timeout(state.upstream_deadline, call).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!(
                "Market data call exceeded its {:?} deadline",
                state.upstream_deadline
            );
            Err(ApiError::UpstreamDeadline(state.upstream_deadline))
        }
    }
}

async fn get_chart(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ChartQuery>,
) -> ApiResult<Json<ChartResponse>> {
    let symbol = normalize_symbol(q.symbol.as_deref().unwrap_or_default())?;
    let period: Period = parse_or_default(q.period.as_deref())?;
    let interval: Interval = parse_or_default(q.interval.as_deref())?;
    tracing::debug!("Chart request for {} ({}, {})", symbol, period, interval);

    let series = within_deadline(
        &state,
        state.market_data.get_history(&symbol, period, interval),
    )
    .await?;
    Ok(Json(ChartResponse::from(series.as_ref())))
}

async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(q): Query<QuoteQuery>,
) -> ApiResult<Json<QuoteResponse>> {
    let symbol = normalize_symbol(q.symbol.as_deref().unwrap_or_default())?;
    tracing::debug!("Quote request for {}", symbol);

    let info = within_deadline(&state, state.market_data.get_info(&symbol)).await?;
    Ok(Json(QuoteResponse {
        quote_response: QuoteBody {
            result: vec![info.summary(&symbol)],
        },
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/yahoo-finance/chart", get(get_chart))
        .route("/yahoo-finance/quote", get(get_quote))
}
