//! Market data bundles fetched from the gateway

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-ticker snapshot, shared read-only by all alerts on that ticker for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastQuote {
    pub current_price: f64,
    #[serde(default)]
    pub day_high: Option<f64>,
    #[serde(default)]
    pub day_low: Option<f64>,
    #[serde(default)]
    pub last_volume: Option<f64>,
    #[serde(default)]
    pub average_volume: Option<f64>,
}

impl FastQuote {
    pub fn new(current_price: f64) -> Self {
        Self {
            current_price,
            day_high: None,
            day_low: None,
            last_volume: None,
            average_volume: None,
        }
    }

    pub fn with_volume(mut self, last_volume: f64) -> Self {
        self.last_volume = Some(last_volume);
        self
    }
}

/// Ratios only fetched when an alert on the ticker needs them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedData {
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub volatility_30d: Option<f64>,
    #[serde(default)]
    pub next_earnings_date: Option<NaiveDate>,
}

/// Bar interval requested from the history endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Ordered bars for one ticker, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub ticker: String,
    pub candles: Vec<Candle>,
}

impl HistoricalSeries {
    pub fn new(ticker: impl Into<String>, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self {
            ticker: ticker.into(),
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}
