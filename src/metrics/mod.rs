//! Prometheus metrics for evaluation cycles

use crate::alerts::prefetch::FetchCounts;
use crate::models::cycle::CycleSummary;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

pub struct Metrics {
    registry: Registry,
    pub cycles_total: IntCounter,
    pub alerts_checked_total: IntCounter,
    pub alerts_triggered_total: IntCounter,
    pub alert_errors_total: IntCounter,
    pub alerts_expired_total: IntCounter,
    pub gateway_fetches_total: IntCounterVec,
    pub cycle_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cycles_total = IntCounter::new("alert_cycles_total", "Evaluation cycles run")?;
        let alerts_checked_total =
            IntCounter::new("alerts_checked_total", "Alerts evaluated without error")?;
        let alerts_triggered_total = IntCounter::new("alerts_triggered_total", "Alerts fired")?;
        let alert_errors_total =
            IntCounter::new("alert_errors_total", "Alerts skipped because evaluation failed")?;
        let alerts_expired_total =
            IntCounter::new("alerts_expired_total", "Alerts deactivated on expiry")?;
        let gateway_fetches_total = IntCounterVec::new(
            Opts::new("gateway_fetches_total", "Market data gateway calls"),
            &["kind"],
        )?;
        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("alert_cycle_duration_seconds", "Wall time of one cycle")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;

        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(alerts_checked_total.clone()))?;
        registry.register(Box::new(alerts_triggered_total.clone()))?;
        registry.register(Box::new(alert_errors_total.clone()))?;
        registry.register(Box::new(alerts_expired_total.clone()))?;
        registry.register(Box::new(gateway_fetches_total.clone()))?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            alerts_checked_total,
            alerts_triggered_total,
            alert_errors_total,
            alerts_expired_total,
            gateway_fetches_total,
            cycle_duration_seconds,
        })
    }

    pub fn record_cycle(
        &self,
        summary: &CycleSummary,
        expired: usize,
        fetches: FetchCounts,
        elapsed: Duration,
    ) {
        self.cycles_total.inc();
        self.alerts_checked_total.inc_by(summary.checked_count as u64);
        self.alerts_triggered_total.inc_by(summary.triggered_count as u64);
        self.alert_errors_total.inc_by(summary.error_count as u64);
        self.alerts_expired_total.inc_by(expired as u64);
        for (kind, count) in [
            ("fast_quote", fetches.fast_quotes),
            ("extended", fetches.extended),
            ("earnings", fetches.earnings),
            ("history", fetches.history),
        ] {
            self.gateway_fetches_total
                .with_label_values(&[kind])
                .inc_by(count as u64);
        }
        self.cycle_duration_seconds.observe(elapsed.as_secs_f64());
    }

    /// Text exposition format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
