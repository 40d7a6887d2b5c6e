use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat key/value metadata for a ticker (`shortName`, `marketCap`, ...).
///
/// Missing keys and explicit `null`s read the same: `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerInfo(Map<String, Value>);

impl TickerInfo {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Integer fields sometimes arrive as floats (`1.2E9`).
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let value = self.get(key)?;
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Project the documented quote fields.
    pub fn summary(&self, symbol: &str) -> QuoteSummary {
        QuoteSummary {
            symbol: symbol.to_string(),
            short_name: self.get_str("shortName").map(str::to_string),
            long_name: self.get_str("longName").map(str::to_string),
            regular_market_price: self.get_f64("regularMarketPrice"),
            regular_market_change: self.get_f64("regularMarketChange"),
            regular_market_change_percent: self.get_f64("regularMarketChangePercent"),
            regular_market_open: self.get_f64("regularMarketOpen"),
            regular_market_day_high: self.get_f64("regularMarketDayHigh"),
            regular_market_day_low: self.get_f64("regularMarketDayLow"),
            regular_market_volume: self.get_u64("regularMarketVolume"),
            market_cap: self.get_u64("marketCap"),
            fifty_two_week_high: self.get_f64("fiftyTwoWeekHigh"),
            fifty_two_week_low: self.get_f64("fiftyTwoWeekLow"),
            average_volume: self.get_u64("averageVolume"),
            trailing_pe: self.get_f64("trailingPE"),
            dividend_yield: self.get_f64("dividendYield"),
        }
    }
}

/// The quote fields the front end reads. Absent values serialize as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub regular_market_open: Option<f64>,
    pub regular_market_day_high: Option<f64>,
    pub regular_market_day_low: Option<f64>,
    pub regular_market_volume: Option<u64>,
    pub market_cap: Option<u64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub average_volume: Option<u64>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    pub dividend_yield: Option<f64>,
}
