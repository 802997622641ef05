//! Condition evaluation: dispatch from alert kind to its check
//!
//! Every kind resolves to a boolean. Quotes and ratios come from the cycle's
//! prefetched bundles; indicator kinds pull history through the prefetcher on
//! first use. Too little history is treated as "not triggered", never as an
//! error, so sparse data cannot fire an alert.

use crate::alerts::composite::CompositeEvaluator;
use crate::alerts::conditions;
use crate::alerts::error::AlertError;
use crate::alerts::prefetch::BatchPrefetcher;
use crate::indicators::divergence::{DivergenceConfig, DivergenceDetector};
use crate::indicators::momentum::{macd, rsi};
use crate::indicators::trend::sma;
use crate::models::alert::{Alert, AlertType, ConditionView, TrailFrom};
use crate::models::indicators::DivergenceAnalysis;
use crate::models::market::HistoricalSeries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

const RSI_LOOKBACK_DAYS: u32 = 90;
const DIVERGENCE_LOOKBACK_DAYS: u32 = 180;
const MA_CROSS_LOOKBACK_DAYS: u32 = 400;
const MA_FAST_PERIOD: usize = 50;
const MA_SLOW_PERIOD: usize = 200;
const DEFAULT_SMA_PERIOD: usize = 50;
const DEFAULT_BASELINE_DAYS: usize = 20;
const DEFAULT_EARNINGS_WINDOW_DAYS: u32 = 7;
const DEFAULT_TRAIL_WINDOW_DAYS: u32 = 20;

/// Cycle-scoped inputs shared by every alert evaluation
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub prefetcher: &'a BatchPrefetcher,
    pub now: DateTime<Utc>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(prefetcher: &'a BatchPrefetcher, now: DateTime<Utc>) -> Self {
        Self { prefetcher, now }
    }
}

/// Evaluates one non-composite condition
#[async_trait]
pub trait ConditionCheck: Send + Sync {
    async fn check(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oscillator {
    Rsi,
    MacdHistogram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DivergenceSide {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a whole alert, composite or simple
    pub async fn evaluate(
        &self,
        alert: &Alert,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        if alert.is_composite() {
            CompositeEvaluator::evaluate(alert, self, ctx).await
        } else {
            self.evaluate_condition(&alert.condition_view(), ctx).await
        }
    }

    /// Dispatch a single condition to its handler
    pub async fn evaluate_condition(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        let triggered = match view.alert_type {
            AlertType::Price => self.price(view, ctx)?,
            AlertType::PeRatio => self.ratio(view, ctx, |e| e.pe_ratio)?,
            AlertType::Volatility => self.ratio(view, ctx, |e| e.volatility_30d)?,
            AlertType::Rsi => self.rsi_level(view, ctx).await?,
            AlertType::RsiFallsBelow => self.rsi_falls_below(view, ctx).await?,
            AlertType::RsiBullishDivergence => {
                self.divergence_signal(view, ctx, Oscillator::Rsi, DivergenceSide::Bullish)
                    .await?
            }
            AlertType::RsiBearishDivergence => {
                self.divergence_signal(view, ctx, Oscillator::Rsi, DivergenceSide::Bearish)
                    .await?
            }
            AlertType::MacdBullishDivergence => {
                self.divergence_signal(view, ctx, Oscillator::MacdHistogram, DivergenceSide::Bullish)
                    .await?
            }
            AlertType::MacdBearishDivergence => {
                self.divergence_signal(view, ctx, Oscillator::MacdHistogram, DivergenceSide::Bearish)
                    .await?
            }
            AlertType::MaCross => self.ma_cross(view, ctx).await?,
            AlertType::VolumeSpike => self.volume_spike(view, ctx).await?,
            AlertType::PercentFromSma => self.percent_from_sma(view, ctx).await?,
            AlertType::TrailingStop => self.trailing_stop(view, ctx).await?,
            AlertType::Earnings => self.earnings(view, ctx)?,
            AlertType::Composite => {
                warn!(alert_id = view.alert_id, "nested composite conditions are not supported");
                false
            }
            AlertType::Unknown(name) => {
                warn!(alert_id = view.alert_id, alert_type = %name, "unknown alert type '{}', skipping", name);
                false
            }
        };

        debug!(
            alert_id = view.alert_id,
            ticker = %view.ticker,
            alert_type = %view.alert_type,
            triggered,
            "evaluated {} condition for {}",
            view.alert_type,
            view.ticker
        );
        Ok(triggered)
    }

    /// Full divergence report for a ticker, as used by the divergence kinds
    pub async fn divergence_analysis(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
        oscillator: Oscillator,
    ) -> Result<DivergenceAnalysis, AlertError> {
        let series = ctx
            .prefetcher
            .history(view.ticker, DIVERGENCE_LOOKBACK_DAYS)
            .await?;

        let closes = series.closes();
        let indicator = match oscillator {
            Oscillator::Rsi => rsi::rsi_series(&closes, rsi_period(view)),
            Oscillator::MacdHistogram => macd::macd_histogram_series(
                &closes,
                macd::DEFAULT_FAST,
                macd::DEFAULT_SLOW,
                macd::DEFAULT_SIGNAL,
            ),
        };

        // oscillators start late; align everything on the indicator's tail
        let offset = closes.len() - indicator.len();
        let dates: Vec<_> = series.candles[offset..].iter().map(|c| c.date()).collect();

        let mut config = DivergenceConfig::default();
        if let Some(lookback) = view.options.lookback_days {
            config.lookback = lookback;
        }
        if let Some(num_peaks) = view.options.num_peaks {
            config.num_peaks = num_peaks;
        }

        Ok(DivergenceDetector::new(config).analyze(&dates, &closes[offset..], &indicator))
    }

    fn price(&self, view: &ConditionView<'_>, ctx: &EvaluationContext<'_>) -> Result<bool, AlertError> {
        let bundle = ctx.prefetcher.bundle(view.ticker)?;
        Ok(conditions::compare(
            bundle.fast_quote.current_price,
            view.condition,
            view.threshold,
        ))
    }

    fn ratio(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
        pick: impl Fn(&crate::models::market::ExtendedData) -> Option<f64>,
    ) -> Result<bool, AlertError> {
        let bundle = ctx.prefetcher.bundle(view.ticker)?;
        let Some(value) = bundle.extended.as_ref().and_then(pick) else {
            debug!(ticker = %view.ticker, alert_type = %view.alert_type, "no {} value for {}", view.alert_type, view.ticker);
            return Ok(false);
        };
        Ok(conditions::compare(value, view.condition, view.threshold))
    }

    async fn rsi_level(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        let series = ctx.prefetcher.history(view.ticker, RSI_LOOKBACK_DAYS).await?;
        let values = rsi::rsi_series(&series.closes(), rsi_period(view));
        let Some(&current) = values.last() else {
            return Ok(insufficient(view, &series));
        };
        Ok(conditions::compare(current, view.condition, view.threshold))
    }

    async fn rsi_falls_below(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        let series = ctx.prefetcher.history(view.ticker, RSI_LOOKBACK_DAYS).await?;
        let Some((previous, current)) = rsi::last_two_rsi(&series.closes(), rsi_period(view)) else {
            return Ok(insufficient(view, &series));
        };
        Ok(conditions::rsi_falls_below(previous, current, view.threshold))
    }

    async fn divergence_signal(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
        oscillator: Oscillator,
        side: DivergenceSide,
    ) -> Result<bool, AlertError> {
        let analysis = self.divergence_analysis(view, ctx, oscillator).await?;
        let found = match side {
            DivergenceSide::Bullish => analysis.bullish_divergence,
            DivergenceSide::Bearish => analysis.bearish_divergence,
        };
        if found {
            debug!(
                ticker = %view.ticker,
                oscillator = ?oscillator,
                confidence = analysis.confidence,
                "{:?} divergence on {} (confidence {:.2})",
                side,
                view.ticker,
                analysis.confidence
            );
        }
        Ok(found)
    }

    async fn ma_cross(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        let series = ctx.prefetcher.history(view.ticker, MA_CROSS_LOOKBACK_DAYS).await?;
        let Some(snapshot) = sma::ma_cross_snapshot(&series.closes(), MA_FAST_PERIOD, MA_SLOW_PERIOD)
        else {
            return Ok(insufficient(view, &series));
        };
        Ok(conditions::ma_cross(&snapshot, view.condition))
    }

    async fn volume_spike(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        let bundle = ctx.prefetcher.bundle(view.ticker)?;
        let baseline_days = view.options.baseline_days.unwrap_or(DEFAULT_BASELINE_DAYS);
        let exclude_today = view.options.exclude_today.unwrap_or(true);
        let use_zscore = view.options.use_zscore.unwrap_or(false);

        let lookback = (baseline_days as u32).saturating_mul(2).saturating_add(10);
        let series = ctx.prefetcher.history(view.ticker, lookback).await?;

        let Some(current_volume) = bundle
            .fast_quote
            .last_volume
            .or_else(|| series.candles.last().map(|c| c.volume))
        else {
            return Ok(false);
        };

        let baseline = conditions::baseline_volumes(
            &series.candles,
            ctx.now.date_naive(),
            baseline_days,
            exclude_today,
        );
        let Some(score) = conditions::volume_spike_score(current_volume, &baseline, use_zscore) else {
            return Ok(insufficient(view, &series));
        };
        Ok(conditions::compare(score, view.condition, view.threshold))
    }

    async fn percent_from_sma(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        let bundle = ctx.prefetcher.bundle(view.ticker)?;
        let period = view.options.sma_period.unwrap_or(DEFAULT_SMA_PERIOD);
        let lookback = (period as u32).saturating_mul(2).saturating_add(10);
        let series = ctx.prefetcher.history(view.ticker, lookback).await?;

        let Some(average) = crate::common::math::sma(&series.closes(), period) else {
            return Ok(insufficient(view, &series));
        };
        let Some(diff) = conditions::percent_from_sma(bundle.fast_quote.current_price, average) else {
            return Ok(false);
        };
        Ok(conditions::compare(diff, view.condition, view.threshold))
    }

    async fn trailing_stop(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        let trail_from = view.options.trail_from.unwrap_or(if view.timeframe_days.is_some() {
            TrailFrom::Window
        } else {
            TrailFrom::Creation
        });

        let closes: Vec<f64> = match trail_from {
            TrailFrom::Window => {
                let window = view.timeframe_days.unwrap_or(DEFAULT_TRAIL_WINDOW_DAYS);
                let lookback = window.saturating_mul(2).saturating_add(10);
                let series = ctx.prefetcher.history(view.ticker, lookback).await?;
                let closes = series.closes();
                let start = closes.len().saturating_sub(window as usize);
                closes[start..].to_vec()
            }
            TrailFrom::Creation => {
                let days_since = (ctx.now - view.created_at).num_days().max(0) as u32;
                let series = ctx
                    .prefetcher
                    .history(view.ticker, days_since.saturating_add(5))
                    .await?;
                let since = view.created_at.date_naive();
                series
                    .candles
                    .iter()
                    .filter(|c| c.date() >= since)
                    .map(|c| c.close)
                    .collect()
            }
        };

        Ok(conditions::trailing_stop_hit(&closes, view.threshold))
    }

    fn earnings(&self, view: &ConditionView<'_>, ctx: &EvaluationContext<'_>) -> Result<bool, AlertError> {
        let bundle = ctx.prefetcher.bundle(view.ticker)?;
        let Some(next) = bundle.extended.as_ref().and_then(|e| e.next_earnings_date) else {
            return Ok(false);
        };
        let window = view.timeframe_days.unwrap_or(DEFAULT_EARNINGS_WINDOW_DAYS);
        Ok(conditions::earnings_within(
            next,
            ctx.now.date_naive(),
            i64::from(window),
            view.condition,
        ))
    }
}

#[async_trait]
impl ConditionCheck for ConditionEvaluator {
    async fn check(
        &self,
        view: &ConditionView<'_>,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        self.evaluate_condition(view, ctx).await
    }
}

fn rsi_period(view: &ConditionView<'_>) -> usize {
    view.options.rsi_period.unwrap_or(rsi::DEFAULT_RSI_PERIOD)
}

fn insufficient(view: &ConditionView<'_>, series: &HistoricalSeries) -> bool {
    debug!(
        alert_id = view.alert_id,
        ticker = %view.ticker,
        bars = series.len(),
        "not enough history for {} on {} ({} bars)",
        view.alert_type,
        view.ticker,
        series.len()
    );
    false
}
