//! Moving-average crosses

use crate::common::math;
use crate::models::indicators::MaCrossSnapshot;

/// Fast and slow SMAs at the last bar and the bar before it.
///
/// Needs `slow + 1` closes.
pub fn ma_cross_snapshot(closes: &[f64], fast: usize, slow: usize) -> Option<MaCrossSnapshot> {
    if fast == 0 || slow == 0 || closes.len() < fast.max(slow) + 1 {
        return None;
    }
    let previous = &closes[..closes.len() - 1];

    Some(MaCrossSnapshot {
        prev_fast: math::sma(previous, fast)?,
        prev_slow: math::sma(previous, slow)?,
        curr_fast: math::sma(closes, fast)?,
        curr_slow: math::sma(closes, slow)?,
    })
}
