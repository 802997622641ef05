//! Unit tests for cycle orchestration

use crate::test_utils::{daily_candles, rising_closes, test_now, MockGateway};
use alertwatch::alerts::repository::{AlertRepository, InMemoryAlertRepository, RepositoryError};
use alertwatch::core::runtime::{CycleOrchestrator, RuntimeConfig};
use alertwatch::metrics::Metrics;
use alertwatch::models::alert::{Alert, AlertCondition, AlertOptions, AlertType};
use alertwatch::models::cycle::AlertCheckOutcome;
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

fn price_alert(id: i64, ticker: &str, threshold: f64) -> Alert {
    Alert::new(id, ticker, AlertType::Price, AlertCondition::Above, threshold)
}

fn orchestrator(
    alerts: Vec<Alert>,
    gateway: MockGateway,
) -> (CycleOrchestrator, Arc<InMemoryAlertRepository>, Arc<MockGateway>) {
    let repository = Arc::new(InMemoryAlertRepository::new(alerts));
    let gateway = Arc::new(gateway);
    let orchestrator =
        CycleOrchestrator::new(repository.clone(), gateway.clone(), RuntimeConfig::default());
    (orchestrator, repository, gateway)
}

struct UnavailableRepository;

#[async_trait]
impl AlertRepository for UnavailableRepository {
    async fn list_active(&self) -> Result<Vec<Alert>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _id: i64) -> Result<Option<Alert>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn save_trigger_state(&self, _alert: &Alert) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[test]
fn test_runtime_config_default() {
    let config = RuntimeConfig::default();
    assert_eq!(config.evaluation_interval_seconds, 900);
    assert_eq!(config.prefetch_concurrency, 8);
    assert_eq!(config.cycle_timeout().as_secs(), 300);
    assert!(config.dedupe_history);
}

#[tokio::test]
async fn test_cycle_counts_and_persists_triggers() {
    let (orchestrator, repository, _) = orchestrator(
        vec![price_alert(1, "AAPL", 180.0), price_alert(2, "AAPL", 200.0)],
        MockGateway::new().with_price("AAPL", 190.0),
    );

    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.checked_count, 2);
    assert_eq!(summary.triggered_count, 1);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.timestamp, test_now());
    assert_eq!(summary.triggered_alerts[0].alert_id, 1);

    let stored = repository.get(1).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 1);
    assert_eq!(stored.last_triggered, Some(test_now()));
    assert!(stored.is_active);
}

#[tokio::test]
async fn test_level_triggered_alert_fires_every_cycle() {
    let (orchestrator, repository, _) = orchestrator(
        vec![price_alert(1, "AAPL", 180.0)],
        MockGateway::new().with_price("AAPL", 190.0),
    );

    orchestrator.run_cycle_at(test_now()).await;
    let summary = orchestrator.run_cycle_at(test_now() + Duration::minutes(15)).await;

    assert_eq!(summary.triggered_count, 1);
    assert_eq!(repository.get(1).await.unwrap().unwrap().trigger_count, 2);
}

#[tokio::test]
async fn test_expired_alert_is_deactivated_and_not_counted() {
    let expired = price_alert(1, "AAPL", 180.0).with_expiry_date(test_now() - Duration::hours(1));
    let (orchestrator, repository, gateway) = orchestrator(
        vec![expired, price_alert(2, "MSFT", 400.0)],
        MockGateway::new().with_price("AAPL", 190.0).with_price("MSFT", 410.0),
    );

    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.checked_count, 1);
    assert_eq!(summary.triggered_count, 1);
    assert_eq!(summary.triggered_alerts[0].alert_id, 2);

    let stored = repository.get(1).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.trigger_count, 0);
    // expired alerts are dropped before prefetch
    assert_eq!(MockGateway::calls(&gateway.fast_quote_calls), 1);

    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.checked_count, 1);
}

#[tokio::test]
async fn test_fetch_failure_only_affects_its_ticker() {
    let (orchestrator, repository, _) = orchestrator(
        vec![
            price_alert(1, "AAPL", 180.0),
            price_alert(2, "AAPL", 100.0),
            price_alert(3, "MSFT", 400.0),
            price_alert(4, "MSFT", 500.0),
        ],
        MockGateway::new().failing("AAPL").with_price("MSFT", 410.0),
    );

    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.error_count, 2);
    assert_eq!(summary.checked_count, 2);
    assert_eq!(summary.triggered_count, 1);
    assert_eq!(summary.triggered_alerts[0].alert_id, 3);

    // skipped alerts stay active and untouched
    let skipped = repository.get(1).await.unwrap().unwrap();
    assert!(skipped.is_active);
    assert_eq!(skipped.trigger_count, 0);
}

#[tokio::test]
async fn test_panicking_evaluation_is_contained() {
    let rsi = Alert::new(1, "AAPL", AlertType::Rsi, AlertCondition::Below, 30.0);
    let (orchestrator, _, _) = orchestrator(
        vec![rsi, price_alert(2, "AAPL", 180.0)],
        MockGateway::new().with_price("AAPL", 190.0).panicking("AAPL"),
    );

    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.checked_count, 1);
    assert_eq!(summary.triggered_count, 1);
}

#[tokio::test]
async fn test_repository_failure_still_returns_summary() {
    let orchestrator = CycleOrchestrator::new(
        Arc::new(UnavailableRepository),
        Arc::new(MockGateway::new()),
        RuntimeConfig::default(),
    );

    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.checked_count, 0);
    assert!(summary.triggered_alerts.is_empty());
}

#[tokio::test]
async fn test_trigger_once_deactivates_after_first_fire() {
    let alert = price_alert(1, "AAPL", 180.0).with_options(AlertOptions {
        trigger_once: Some(true),
        ..AlertOptions::default()
    });
    let (orchestrator, repository, _) =
        orchestrator(vec![alert], MockGateway::new().with_price("AAPL", 190.0));

    assert_eq!(orchestrator.run_cycle_at(test_now()).await.triggered_count, 1);
    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.checked_count, 0);
    assert!(!repository.get(1).await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn test_cooldown_suppresses_refire() {
    let alert = price_alert(1, "AAPL", 180.0).with_options(AlertOptions {
        cooldown_minutes: Some(60),
        ..AlertOptions::default()
    });
    let (orchestrator, repository, _) =
        orchestrator(vec![alert], MockGateway::new().with_price("AAPL", 190.0));

    orchestrator.run_cycle_at(test_now()).await;
    let summary = orchestrator.run_cycle_at(test_now() + Duration::minutes(15)).await;
    assert_eq!(summary.checked_count, 1);
    assert_eq!(summary.triggered_count, 0);

    let summary = orchestrator.run_cycle_at(test_now() + Duration::minutes(75)).await;
    assert_eq!(summary.triggered_count, 1);
    assert_eq!(repository.get(1).await.unwrap().unwrap().trigger_count, 2);
}

#[tokio::test]
async fn test_history_fetched_once_per_window() {
    let alerts = vec![
        Alert::new(1, "AAPL", AlertType::Rsi, AlertCondition::Below, 30.0),
        Alert::new(2, "AAPL", AlertType::Rsi, AlertCondition::Above, 70.0),
        Alert::new(3, "AAPL", AlertType::RsiFallsBelow, AlertCondition::Below, 30.0),
    ];
    let (orchestrator, _, gateway) = orchestrator(
        alerts,
        MockGateway::new()
            .with_price("AAPL", 150.0)
            .with_history("AAPL", daily_candles(&rising_closes(60, 100.0, 1.0))),
    );

    let summary = orchestrator.run_cycle_at(test_now()).await;
    assert_eq!(summary.checked_count, 3);
    assert_eq!(summary.triggered_count, 1);
    assert_eq!(MockGateway::calls(&gateway.history_calls), 1);
}

#[tokio::test]
async fn test_metrics_recorded_per_cycle() {
    let metrics = Arc::new(Metrics::new().unwrap());
    let (orchestrator, _, _) = orchestrator(
        vec![price_alert(1, "AAPL", 180.0), price_alert(2, "MSFT", 400.0)],
        MockGateway::new().with_price("AAPL", 190.0).failing("MSFT"),
    );
    let orchestrator = orchestrator.with_metrics(metrics.clone());

    orchestrator.run_cycle_at(test_now()).await;

    assert_eq!(metrics.cycles_total.get(), 1);
    assert_eq!(metrics.alerts_checked_total.get(), 1);
    assert_eq!(metrics.alerts_triggered_total.get(), 1);
    assert_eq!(metrics.alert_errors_total.get(), 1);
    assert_eq!(
        metrics.gateway_fetches_total.with_label_values(&["fast_quote"]).get(),
        2
    );
}

#[tokio::test]
async fn test_check_alert_triggers_and_persists() {
    let (orchestrator, repository, _) = orchestrator(
        vec![price_alert(1, "AAPL", 180.0)],
        MockGateway::new().with_price("AAPL", 190.0),
    );

    let outcome = orchestrator.check_alert_at(1, test_now()).await;
    assert_eq!(
        outcome,
        AlertCheckOutcome::Checked {
            alert_id: 1,
            is_triggered: true,
            checked_at: test_now(),
            trigger_count: 1,
        }
    );
    assert_eq!(repository.get(1).await.unwrap().unwrap().trigger_count, 1);
}

#[tokio::test]
async fn test_check_alert_failures() {
    let mut inactive = price_alert(2, "AAPL", 180.0);
    inactive.is_active = false;
    let expired = price_alert(3, "AAPL", 180.0).with_expiry_date(test_now() - Duration::days(1));
    let (orchestrator, repository, _) = orchestrator(
        vec![price_alert(1, "MSFT", 400.0), inactive, expired],
        MockGateway::new().with_price("AAPL", 190.0).failing("MSFT"),
    );

    for (id, expected) in [
        (1, "market data unavailable for MSFT"),
        (2, "alert 2 is inactive"),
        (3, "alert 3 has expired"),
        (99, "alert 99 not found"),
    ] {
        match orchestrator.check_alert_at(id, test_now()).await {
            AlertCheckOutcome::Failed { alert_id, error } => {
                assert_eq!(alert_id, id);
                assert!(error.starts_with(expected), "unexpected error: {}", error);
            }
            other => panic!("expected failure for alert {}, got {:?}", id, other),
        }
    }

    assert!(!repository.get(3).await.unwrap().unwrap().is_active);
}
