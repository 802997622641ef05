//! Pure condition checks, one per alert kind.
//!
//! Inputs are already-computed values; fetching and indicator math live in
//! the evaluator. Missing or degenerate inputs evaluate to false.

use crate::common::math;
use crate::models::alert::AlertCondition;
use crate::models::indicators::MaCrossSnapshot;
use crate::models::market::Candle;
use chrono::NaiveDate;

/// Absolute tolerance of the `equals` condition
pub const EQUALS_TOLERANCE: f64 = 0.01;

/// Threshold comparison shared by the level-triggered kinds.
///
/// Only `above`, `below` and `equals` compare values; other conditions are false.
pub fn compare(value: f64, condition: AlertCondition, threshold: f64) -> bool {
    if !value.is_finite() {
        return false;
    }
    match condition {
        AlertCondition::Above => value > threshold,
        AlertCondition::Below => value < threshold,
        AlertCondition::Equals => (value - threshold).abs() < EQUALS_TOLERANCE,
        AlertCondition::CrossAbove | AlertCondition::CrossBelow | AlertCondition::Before => false,
    }
}

/// Edge-triggered: true only on the bar where RSI drops through the threshold
pub fn rsi_falls_below(previous: f64, current: f64, threshold: f64) -> bool {
    previous >= threshold && current < threshold
}

/// Golden cross on `cross_above`, death cross on `cross_below`
pub fn ma_cross(snapshot: &MaCrossSnapshot, condition: AlertCondition) -> bool {
    let MaCrossSnapshot {
        prev_fast,
        prev_slow,
        curr_fast,
        curr_slow,
    } = *snapshot;

    match condition {
        AlertCondition::CrossAbove => prev_fast <= prev_slow && curr_fast > curr_slow,
        AlertCondition::CrossBelow => prev_fast >= prev_slow && curr_fast < curr_slow,
        _ => false,
    }
}

/// Volumes forming the spike baseline: the last `baseline_days` bars,
/// dropping bars dated `today` when `exclude_today` is set
pub fn baseline_volumes(
    candles: &[Candle],
    today: NaiveDate,
    baseline_days: usize,
    exclude_today: bool,
) -> Vec<f64> {
    let eligible: Vec<f64> = candles
        .iter()
        .filter(|c| !(exclude_today && c.date() >= today))
        .map(|c| c.volume)
        .collect();
    let start = eligible.len().saturating_sub(baseline_days);
    eligible[start..].to_vec()
}

/// Ratio to the baseline mean, or a z-score against it
pub fn volume_spike_score(current_volume: f64, baseline: &[f64], use_zscore: bool) -> Option<f64> {
    let avg = math::mean(baseline)?;
    if use_zscore {
        let sd = math::std_dev(baseline)?;
        if sd == 0.0 {
            return None;
        }
        Some((current_volume - avg) / sd)
    } else {
        if avg == 0.0 {
            return None;
        }
        Some(current_volume / avg)
    }
}

/// Percent distance of `price` from `sma`
pub fn percent_from_sma(price: f64, sma: f64) -> Option<f64> {
    if sma == 0.0 {
        return None;
    }
    Some((price - sma) / sma * 100.0)
}

/// `closes` run from the reference start to the current bar.
///
/// Fires when the current close is at or below the running high less
/// `trail_pct` percent.
pub fn trailing_stop_hit(closes: &[f64], trail_pct: f64) -> bool {
    let Some(&current) = closes.last() else {
        return false;
    };
    let highest = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    current <= highest * (1.0 - trail_pct / 100.0)
}

/// Next earnings falls within `[0, window_days]` days of `today`
pub fn earnings_within(
    next_earnings: NaiveDate,
    today: NaiveDate,
    window_days: i64,
    condition: AlertCondition,
) -> bool {
    if condition != AlertCondition::Before {
        return false;
    }
    let days_until = (next_earnings - today).num_days();
    (0..=window_days).contains(&days_until)
}
