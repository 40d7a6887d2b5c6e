//! Yahoo Finance API response models.
//!
//! The chart endpoint carries the OHLCV series; the quoteSummary endpoint
//! carries the metadata modules that get flattened into a `TickerInfo`.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Main response wrapper for the v8 chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

#[derive(Debug, Deserialize)]
pub struct YahooChart {
    pub result: Option<Vec<YahooChartResult>>,
    pub error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    /// Missing entirely when the range holds no bars
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
pub struct YahooIndicators {
    #[serde(default)]
    pub quote: Vec<YahooQuoteColumns>,
}

/// Column-oriented OHLCV arrays, aligned with `timestamp`.
#[derive(Debug, Default, Deserialize)]
pub struct YahooQuoteColumns {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

/// Error object both APIs embed in their envelopes.
#[derive(Debug, Deserialize)]
pub struct YahooApiError {
    pub code: Option<String>,
    pub description: Option<String>,
}

impl YahooApiError {
    pub fn is_not_found(&self) -> bool {
        self.code
            .as_deref()
            .map(|c| c.eq_ignore_ascii_case("Not Found"))
            .unwrap_or(false)
    }

    pub fn message(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => format!("{}: {}", code, description),
            (Some(code), None) => code.clone(),
            (None, Some(description)) => description.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Main response wrapper for the v10 quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: YahooQuoteSummary,
}

/// Quote summary container; each result maps module name to module object.
#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    pub result: Option<Vec<Map<String, Value>>>,
    pub error: Option<YahooApiError>,
}

/// Merge quoteSummary modules into one flat mapping.
///
/// Numbers arrive as `{"raw": 1.0, "fmt": "1.00"}`; only `raw` is kept.
/// Empty objects (`{}`) mean "not available" and become `null`. When two
/// modules carry the same key the first module listed wins.
pub fn flatten_modules(result: &Map<String, Value>, modules: &[&str]) -> Map<String, Value> {
    let mut flat = Map::new();
    for module in modules {
        let Some(Value::Object(fields)) = result.get(*module) else {
            continue;
        };
        for (key, value) in fields {
            if flat.contains_key(key) {
                continue;
            }
            flat.insert(key.clone(), unwrap_raw(value));
        }
    }
    flat
}

fn unwrap_raw(value: &Value) -> Value {
    match value {
        Value::Object(obj) if obj.contains_key("raw") => obj["raw"].clone(),
        Value::Object(obj) if obj.is_empty() => Value::Null,
        other => other.clone(),
    }
}
