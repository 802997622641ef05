use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fast/slow moving averages at the latest and the preceding bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaCrossSnapshot {
    pub prev_fast: f64,
    pub prev_slow: f64,
    pub curr_fast: f64,
    pub curr_slow: f64,
}

/// Extremum that took part in a confirmed divergence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergencePoint {
    pub date: NaiveDate,
    pub price: f64,
    pub indicator_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DivergencePoints {
    pub bullish: Vec<DivergencePoint>,
    pub bearish: Vec<DivergencePoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DivergenceAnalysis {
    pub bullish_divergence: bool,
    pub bearish_divergence: bool,
    /// 0 to 100
    pub confidence: f64,
    pub divergence_points: DivergencePoints,
}

impl DivergenceAnalysis {
    pub fn none() -> Self {
        Self::default()
    }
}
