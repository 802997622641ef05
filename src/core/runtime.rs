//! Cycle orchestration: one evaluation pass over every active alert

use crate::alerts::error::AlertError;
use crate::alerts::evaluator::{ConditionEvaluator, EvaluationContext};
use crate::alerts::prefetch::{
    BatchPrefetcher, FetchCounts, PrefetchOptions, DEFAULT_PREFETCH_CONCURRENCY,
};
use crate::alerts::repository::AlertRepository;
use crate::alerts::trigger::{TriggerDecision, TriggerStateTracker};
use crate::config::{self, ConfigError};
use crate::metrics::Metrics;
use crate::models::alert::Alert;
use crate::models::cycle::{AlertCheckOutcome, CycleSummary};
use crate::services::market_data::MarketDataGateway;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for the evaluation runtime
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub evaluation_interval_seconds: u64,
    pub prefetch_concurrency: usize,
    pub cycle_timeout_seconds: u64,
    pub dedupe_history: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_seconds: 900,
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            cycle_timeout_seconds: 300,
            dedupe_history: true,
        }
    }
}

impl RuntimeConfig {
    /// Read `EVAL_INTERVAL_SECONDS`, `PREFETCH_CONCURRENCY`,
    /// `CYCLE_TIMEOUT_SECONDS` and `DEDUPE_HISTORY` over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            evaluation_interval_seconds: config::env_or(
                "EVAL_INTERVAL_SECONDS",
                defaults.evaluation_interval_seconds,
            )?,
            prefetch_concurrency: config::env_or(
                "PREFETCH_CONCURRENCY",
                defaults.prefetch_concurrency,
            )?,
            cycle_timeout_seconds: config::env_or(
                "CYCLE_TIMEOUT_SECONDS",
                defaults.cycle_timeout_seconds,
            )?,
            dedupe_history: config::env_or("DEDUPE_HISTORY", defaults.dedupe_history)?,
        })
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_seconds)
    }

    fn prefetch_options(&self) -> PrefetchOptions {
        PrefetchOptions {
            concurrency: self.prefetch_concurrency.max(1),
            dedupe_history: self.dedupe_history,
        }
    }
}

/// Runs evaluation cycles against a repository and a market data gateway.
///
/// Trigger state is written back after each alert, so a crash mid-cycle
/// loses nothing already evaluated.
pub struct CycleOrchestrator {
    repository: Arc<dyn AlertRepository>,
    gateway: Arc<dyn MarketDataGateway>,
    evaluator: ConditionEvaluator,
    config: RuntimeConfig,
    metrics: Option<Arc<Metrics>>,
}

impl CycleOrchestrator {
    pub fn new(
        repository: Arc<dyn AlertRepository>,
        gateway: Arc<dyn MarketDataGateway>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            repository,
            gateway,
            evaluator: ConditionEvaluator::new(),
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub async fn run_cycle(&self) -> CycleSummary {
        self.run_cycle_at(Utc::now()).await
    }

    /// Evaluate every active alert as of `now`. Always returns a summary.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleSummary {
        let start = Instant::now();
        let mut summary = CycleSummary::empty(now);

        let alerts = match self.repository.list_active().await {
            Ok(alerts) => alerts,
            Err(e) => {
                error!(error = %e, "CycleOrchestrator: failed to load active alerts");
                summary.error_count = 1;
                self.record_metrics(&summary, 0, FetchCounts::default(), start.elapsed());
                return summary;
            }
        };

        let total = alerts.len();
        let mut expired = 0;
        let mut to_evaluate = Vec::with_capacity(total);
        for mut alert in alerts {
            match TriggerStateTracker::decide(&alert, now) {
                TriggerDecision::Expired => {
                    TriggerStateTracker::expire(&mut alert);
                    info!(alert_id = alert.id, ticker = %alert.ticker, "CycleOrchestrator: alert {} expired", alert.id);
                    self.persist(&alert).await;
                    expired += 1;
                }
                TriggerDecision::CoolingDown => {
                    debug!(alert_id = alert.id, "CycleOrchestrator: alert {} cooling down", alert.id);
                    summary.checked_count += 1;
                }
                TriggerDecision::Evaluate => to_evaluate.push(alert),
            }
        }

        let mut prefetcher = BatchPrefetcher::new(self.gateway.clone(), self.config.prefetch_options());
        prefetcher.prefetch(&to_evaluate).await;
        let ctx = EvaluationContext::new(&prefetcher, now);

        for mut alert in to_evaluate {
            match self.evaluate_guarded(&alert, &ctx).await {
                Ok(triggered) => {
                    summary.checked_count += 1;
                    if triggered {
                        let event = TriggerStateTracker::record_trigger(&mut alert, now);
                        info!(
                            alert_id = alert.id,
                            ticker = %alert.ticker,
                            alert_type = %alert.alert_type,
                            trigger_count = alert.trigger_count,
                            "CycleOrchestrator: alert {} triggered for {} ({})",
                            alert.id,
                            alert.ticker,
                            alert.alert_type
                        );
                        self.persist(&alert).await;
                        summary.triggered_count += 1;
                        summary.triggered_alerts.push(event);
                    }
                }
                Err(e) => {
                    warn!(
                        alert_id = alert.id,
                        ticker = %alert.ticker,
                        error = %e,
                        "CycleOrchestrator: alert {} skipped: {}",
                        alert.id,
                        e
                    );
                    summary.error_count += 1;
                }
            }
        }

        let elapsed = start.elapsed();
        info!(
            alerts = total,
            checked = summary.checked_count,
            triggered = summary.triggered_count,
            errors = summary.error_count,
            expired,
            duration_ms = elapsed.as_millis() as u64,
            "CycleOrchestrator: cycle complete - {} checked, {} triggered, {} errors",
            summary.checked_count,
            summary.triggered_count,
            summary.error_count
        );
        self.record_metrics(&summary, expired, prefetcher.fetch_counts(), elapsed);

        summary
    }

    pub async fn check_alert(&self, alert_id: i64) -> AlertCheckOutcome {
        self.check_alert_at(alert_id, Utc::now()).await
    }

    /// Evaluate a single alert on demand, recording a trigger like a cycle would
    pub async fn check_alert_at(&self, alert_id: i64, now: DateTime<Utc>) -> AlertCheckOutcome {
        let failed = |error: AlertError| AlertCheckOutcome::Failed {
            alert_id,
            error: error.to_string(),
        };

        let mut alert = match self.repository.get(alert_id).await {
            Ok(Some(alert)) => alert,
            Ok(None) => return failed(AlertError::NotFound(alert_id)),
            Err(e) => return failed(e.into()),
        };

        if !alert.is_active {
            return failed(AlertError::Inactive(alert_id));
        }

        match TriggerStateTracker::decide(&alert, now) {
            TriggerDecision::Expired => {
                TriggerStateTracker::expire(&mut alert);
                self.persist(&alert).await;
                return failed(AlertError::Expired(alert_id));
            }
            TriggerDecision::CoolingDown => {
                return AlertCheckOutcome::Checked {
                    alert_id,
                    is_triggered: false,
                    checked_at: now,
                    trigger_count: alert.trigger_count,
                };
            }
            TriggerDecision::Evaluate => {}
        }

        let mut prefetcher = BatchPrefetcher::new(self.gateway.clone(), self.config.prefetch_options());
        prefetcher.prefetch(std::slice::from_ref(&alert)).await;
        let ctx = EvaluationContext::new(&prefetcher, now);

        match self.evaluate_guarded(&alert, &ctx).await {
            Ok(triggered) => {
                if triggered {
                    TriggerStateTracker::record_trigger(&mut alert, now);
                    self.persist(&alert).await;
                }
                AlertCheckOutcome::Checked {
                    alert_id,
                    is_triggered: triggered,
                    checked_at: now,
                    trigger_count: alert.trigger_count,
                }
            }
            Err(e) => failed(e),
        }
    }

    /// Evaluate one alert, turning a missing bundle or a panic into an error
    async fn evaluate_guarded(
        &self,
        alert: &Alert,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, AlertError> {
        ctx.prefetcher.bundle(&alert.ticker)?;

        AssertUnwindSafe(self.evaluator.evaluate(alert, ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(AlertError::Panicked(panic_message(panic))))
    }

    async fn persist(&self, alert: &Alert) {
        if let Err(e) = self.repository.save_trigger_state(alert).await {
            error!(
                alert_id = alert.id,
                error = %e,
                "CycleOrchestrator: failed to save trigger state for alert {}",
                alert.id
            );
        }
    }

    fn record_metrics(
        &self,
        summary: &CycleSummary,
        expired: usize,
        fetches: FetchCounts,
        elapsed: Duration,
    ) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cycle(summary, expired, fetches, elapsed);
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
