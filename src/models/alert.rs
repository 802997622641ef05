//! Alert definitions and the trigger events they produce

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of watch condition an alert evaluates.
///
/// Stored as a snake_case string. Names this build does not recognize
/// deserialize into `Unknown` so a newer writer never breaks the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertType {
    Price,
    PeRatio,
    Volatility,
    Rsi,
    RsiFallsBelow,
    RsiBullishDivergence,
    RsiBearishDivergence,
    MacdBullishDivergence,
    MacdBearishDivergence,
    MaCross,
    VolumeSpike,
    PercentFromSma,
    TrailingStop,
    Earnings,
    Composite,
    Unknown(String),
}

impl AlertType {
    pub fn as_str(&self) -> &str {
        match self {
            AlertType::Price => "price",
            AlertType::PeRatio => "pe_ratio",
            AlertType::Volatility => "volatility",
            AlertType::Rsi => "rsi",
            AlertType::RsiFallsBelow => "rsi_falls_below",
            AlertType::RsiBullishDivergence => "rsi_bullish_divergence",
            AlertType::RsiBearishDivergence => "rsi_bearish_divergence",
            AlertType::MacdBullishDivergence => "macd_bullish_divergence",
            AlertType::MacdBearishDivergence => "macd_bearish_divergence",
            AlertType::MaCross => "ma_cross",
            AlertType::VolumeSpike => "volume_spike",
            AlertType::PercentFromSma => "percent_from_sma",
            AlertType::TrailingStop => "trailing_stop",
            AlertType::Earnings => "earnings",
            AlertType::Composite => "composite",
            AlertType::Unknown(name) => name,
        }
    }

    /// Whether evaluating this kind reads the ticker's extended data bundle
    pub fn needs_extended_data(&self) -> bool {
        matches!(
            self,
            AlertType::PeRatio | AlertType::Volatility | AlertType::Earnings
        )
    }
}

impl FromStr for AlertType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "price" => AlertType::Price,
            "pe_ratio" => AlertType::PeRatio,
            "volatility" => AlertType::Volatility,
            "rsi" => AlertType::Rsi,
            "rsi_falls_below" => AlertType::RsiFallsBelow,
            "rsi_bullish_divergence" => AlertType::RsiBullishDivergence,
            "rsi_bearish_divergence" => AlertType::RsiBearishDivergence,
            "macd_bullish_divergence" => AlertType::MacdBullishDivergence,
            "macd_bearish_divergence" => AlertType::MacdBearishDivergence,
            "ma_cross" => AlertType::MaCross,
            "volume_spike" => AlertType::VolumeSpike,
            "percent_from_sma" => AlertType::PercentFromSma,
            "trailing_stop" => AlertType::TrailingStop,
            "earnings" => AlertType::Earnings,
            "composite" => AlertType::Composite,
            other => AlertType::Unknown(other.to_string()),
        })
    }
}

impl From<String> for AlertType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<AlertType> for String {
    fn from(value: AlertType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied to the alert's measured value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    Above,
    Below,
    Equals,
    CrossAbove,
    CrossBelow,
    Before,
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
            AlertCondition::Equals => "equals",
            AlertCondition::CrossAbove => "cross_above",
            AlertCondition::CrossBelow => "cross_below",
            AlertCondition::Before => "before",
        };
        f.write_str(name)
    }
}

/// Reference start for the trailing stop's running high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailFrom {
    Creation,
    Window,
}

/// Per-kind parameters. Every field is optional; handlers apply their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertOptions {
    #[serde(alias = "period", skip_serializing_if = "Option::is_none")]
    pub sma_period: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_days: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_zscore: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_today: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi_period: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_peaks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_from: Option<TrailFrom>,
    /// Suppress evaluation for this many minutes after a trigger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_minutes: Option<i64>,
    /// Deactivate the alert after its first trigger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_once: Option<bool>,
}

/// One leg of a composite alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCondition {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub condition: AlertCondition,
    #[serde(default)]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe_days: Option<u32>,
    #[serde(default)]
    pub options: AlertOptions,
}

impl SubCondition {
    /// Single-condition view of this leg, bound to its parent's instrument
    pub fn view<'a>(&'a self, parent: &'a Alert) -> ConditionView<'a> {
        ConditionView {
            alert_id: parent.id,
            ticker: &parent.ticker,
            alert_type: &self.alert_type,
            condition: self.condition,
            threshold: self.value,
            timeframe_days: self.timeframe_days,
            options: &self.options,
            created_at: parent.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_id: Option<i64>,
    #[serde(deserialize_with = "deserialize_ticker")]
    pub ticker: String,
    pub alert_type: AlertType,
    pub condition: AlertCondition,
    #[serde(default)]
    pub threshold_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe_days: Option<u32>,
    #[serde(default)]
    pub options: AlertOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub composite_conditions: Vec<SubCondition>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trigger_count: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Tickers are grouped and looked up upper-cased, trimmed of whitespace
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

fn deserialize_ticker<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_ticker(&raw))
}

impl Alert {
    pub fn new(
        id: i64,
        ticker: impl Into<String>,
        alert_type: AlertType,
        condition: AlertCondition,
        threshold_value: f64,
    ) -> Self {
        Self {
            id,
            instrument_id: None,
            ticker: normalize_ticker(&ticker.into()),
            alert_type,
            condition,
            threshold_value,
            timeframe_days: None,
            options: AlertOptions::default(),
            composite_conditions: Vec::new(),
            is_active: true,
            expiry_date: None,
            last_triggered: None,
            trigger_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_timeframe_days(mut self, days: u32) -> Self {
        self.timeframe_days = Some(days);
        self
    }

    pub fn with_options(mut self, options: AlertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_composite_conditions(mut self, conditions: Vec<SubCondition>) -> Self {
        self.composite_conditions = conditions;
        self
    }

    pub fn with_expiry_date(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_composite(&self) -> bool {
        self.alert_type == AlertType::Composite
    }

    /// Whether this alert, or any of its composite legs, reads extended data
    pub fn needs_extended_data(&self) -> bool {
        self.alert_type.needs_extended_data()
            || self
                .composite_conditions
                .iter()
                .any(|c| c.alert_type.needs_extended_data())
    }

    pub fn needs_earnings_date(&self) -> bool {
        self.alert_type == AlertType::Earnings
            || self
                .composite_conditions
                .iter()
                .any(|c| c.alert_type == AlertType::Earnings)
    }

    pub fn condition_view(&self) -> ConditionView<'_> {
        ConditionView {
            alert_id: self.id,
            ticker: &self.ticker,
            alert_type: &self.alert_type,
            condition: self.condition,
            threshold: self.threshold_value,
            timeframe_days: self.timeframe_days,
            options: &self.options,
            created_at: self.created_at,
        }
    }
}

/// Borrowed single-condition input to the condition evaluator.
///
/// Built either from a simple alert or from one composite leg.
#[derive(Debug, Clone, Copy)]
pub struct ConditionView<'a> {
    pub alert_id: i64,
    pub ticker: &'a str,
    pub alert_type: &'a AlertType,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub timeframe_days: Option<u32>,
    pub options: &'a AlertOptions,
    pub created_at: DateTime<Utc>,
}

/// Emitted when an alert fires; the caller persists or delivers it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub alert_id: i64,
    pub ticker: String,
    pub alert_type: AlertType,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub triggered_at: DateTime<Utc>,
}
