//! MACD (Moving Average Convergence Divergence) indicator

use crate::common::math;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// One MACD reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD series.
///
/// MACD = EMA(fast) - EMA(slow), Signal = EMA(signal) of MACD,
/// Histogram = MACD - Signal. The result is aligned to
/// `closes[slow + signal - 2..]`.
pub fn macd_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    if fast == 0 || fast >= slow || signal == 0 || closes.len() < slow + signal - 1 {
        return Vec::new();
    }

    let fast_ema = math::ema_series(closes, fast);
    let slow_ema = math::ema_series(closes, slow);

    // fast_ema starts at closes[fast - 1], slow_ema at closes[slow - 1]
    let offset = slow - fast;
    let macd_line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(i, slow_value)| fast_ema[i + offset] - slow_value)
        .collect();

    let signal_line = math::ema_series(&macd_line, signal);
    let skip = signal - 1;

    signal_line
        .iter()
        .enumerate()
        .map(|(i, &signal_value)| {
            let macd = macd_line[i + skip];
            MacdPoint {
                macd,
                signal: signal_value,
                histogram: macd - signal_value,
            }
        })
        .collect()
}

/// Histogram values only, aligned like [`macd_series`]
pub fn macd_histogram_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
    macd_series(closes, fast, slow, signal)
        .into_iter()
        .map(|p| p.histogram)
        .collect()
}
