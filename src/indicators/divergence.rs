//! Price/oscillator divergence detection
//!
//! Finds local extrema of the price series and compares the oscillator at the
//! same bars. A lower price low with a higher oscillator low is bullish; a
//! higher price high with a lower oscillator high is bearish. The detector is
//! indicator-agnostic: RSI and the MACD histogram both feed through it.

use crate::models::indicators::{DivergenceAnalysis, DivergencePoint, DivergencePoints};
use chrono::NaiveDate;

pub const DEFAULT_LOOKBACK: usize = 60;
pub const DEFAULT_NUM_PEAKS: usize = 3;
pub const DEFAULT_ORDER: usize = 5;
pub const MIN_BARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceConfig {
    /// Trailing bars analysed
    pub lookback: usize,
    /// Most recent extrema compared, pairwise
    pub num_peaks: usize,
    /// Neighbourhood radius of the extremum test
    pub order: usize,
    /// Shorter input yields no signal
    pub min_bars: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            num_peaks: DEFAULT_NUM_PEAKS,
            order: DEFAULT_ORDER,
            min_bars: MIN_BARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Bullish,
    Bearish,
}

#[derive(Debug, Default)]
struct SideResult {
    confirming_pairs: usize,
    max_disagreement: f64,
    points: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DivergenceDetector {
    config: DivergenceConfig,
}

impl DivergenceDetector {
    pub fn new(config: DivergenceConfig) -> Self {
        Self { config }
    }

    /// Analyse aligned `dates`, `prices` and `indicator` series (oldest first)
    pub fn analyze(
        &self,
        dates: &[NaiveDate],
        prices: &[f64],
        indicator: &[f64],
    ) -> DivergenceAnalysis {
        let n = prices.len();
        if n != indicator.len() || n != dates.len() || n < self.config.min_bars {
            return DivergenceAnalysis::none();
        }

        let start = n.saturating_sub(self.config.lookback);
        let dates = &dates[start..];
        let prices = &prices[start..];
        let indicator = &indicator[start..];

        let minima = local_minima(prices, self.config.order);
        let maxima = local_maxima(prices, self.config.order);

        let bullish = self.check_side(Side::Bullish, &minima, prices, indicator);
        let bearish = self.check_side(Side::Bearish, &maxima, prices, indicator);

        let confidence = self
            .side_confidence(&bullish)
            .max(self.side_confidence(&bearish));

        let to_points = |result: &SideResult| -> Vec<DivergencePoint> {
            result
                .points
                .iter()
                .map(|&i| DivergencePoint {
                    date: dates[i],
                    price: prices[i],
                    indicator_value: indicator[i],
                })
                .collect()
        };

        DivergenceAnalysis {
            bullish_divergence: bullish.confirming_pairs > 0,
            bearish_divergence: bearish.confirming_pairs > 0,
            confidence: (confidence * 100.0).round() / 100.0,
            divergence_points: DivergencePoints {
                bullish: to_points(&bullish),
                bearish: to_points(&bearish),
            },
        }
    }

    fn check_side(
        &self,
        side: Side,
        extrema: &[usize],
        prices: &[f64],
        indicator: &[f64],
    ) -> SideResult {
        let keep = self.config.num_peaks.max(2);
        let recent = &extrema[extrema.len().saturating_sub(keep)..];
        let mut result = SideResult::default();

        if recent.len() < 2 {
            return result;
        }

        for pair in recent.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (price_a, price_b) = (prices[a], prices[b]);
            let (ind_a, ind_b) = (indicator[a], indicator[b]);
            if !(ind_a.is_finite() && ind_b.is_finite()) {
                continue;
            }

            let diverges = match side {
                Side::Bullish => price_b < price_a && ind_b > ind_a,
                Side::Bearish => price_b > price_a && ind_b < ind_a,
            };
            if !diverges {
                continue;
            }

            result.confirming_pairs += 1;
            let scale = ind_a.abs().max(ind_b.abs());
            if scale > 0.0 {
                result.max_disagreement = result.max_disagreement.max((ind_b - ind_a).abs() / scale);
            }
            result.points.push(a);
            result.points.push(b);
        }

        result.points.sort_unstable();
        result.points.dedup();
        result
    }

    /// 0 when nothing confirms, otherwise half from how many adjacent pairs
    /// confirm and half from the largest relative oscillator disagreement
    fn side_confidence(&self, result: &SideResult) -> f64 {
        if result.confirming_pairs == 0 {
            return 0.0;
        }
        let possible_pairs = (self.config.num_peaks.max(2) - 1) as f64;
        let count_part = (result.confirming_pairs as f64 / possible_pairs).min(1.0);
        let magnitude_part = result.max_disagreement.min(1.0);
        (50.0 * count_part + 50.0 * magnitude_part).clamp(0.0, 100.0)
    }
}

/// Indices whose value is strictly below the `order` bars before it and no
/// higher than the `order` bars after it. Edges without a full neighbourhood
/// are never extrema.
pub fn local_minima(values: &[f64], order: usize) -> Vec<usize> {
    find_extrema(values, order, |candidate, other| candidate < other, |candidate, other| {
        candidate <= other
    })
}

/// Mirror of [`local_minima`]
pub fn local_maxima(values: &[f64], order: usize) -> Vec<usize> {
    find_extrema(values, order, |candidate, other| candidate > other, |candidate, other| {
        candidate >= other
    })
}

fn find_extrema(
    values: &[f64],
    order: usize,
    beats_left: impl Fn(f64, f64) -> bool,
    beats_right: impl Fn(f64, f64) -> bool,
) -> Vec<usize> {
    let order = order.max(1);
    if values.len() < 2 * order + 1 {
        return Vec::new();
    }

    (order..values.len() - order)
        .filter(|&i| {
            let v = values[i];
            values[i - order..i].iter().all(|&o| beats_left(v, o))
                && values[i + 1..=i + order].iter().all(|&o| beats_right(v, o))
        })
        .collect()
}
