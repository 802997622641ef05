//! Unit tests for expiry, cooldown and trigger recording

use crate::test_utils::test_now;
use alertwatch::alerts::trigger::{TriggerDecision, TriggerStateTracker};
use alertwatch::models::alert::{Alert, AlertCondition, AlertOptions, AlertType};
use chrono::Duration;

fn alert() -> Alert {
    Alert::new(1, "AAPL", AlertType::Price, AlertCondition::Above, 100.0)
}

#[test]
fn test_no_expiry_evaluates() {
    assert_eq!(TriggerStateTracker::decide(&alert(), test_now()), TriggerDecision::Evaluate);
}

#[test]
fn test_past_expiry_is_expired() {
    let now = test_now();
    let expired = alert().with_expiry_date(now - Duration::minutes(1));
    assert_eq!(TriggerStateTracker::decide(&expired, now), TriggerDecision::Expired);

    let live = alert().with_expiry_date(now + Duration::minutes(1));
    assert_eq!(TriggerStateTracker::decide(&live, now), TriggerDecision::Evaluate);
}

#[test]
fn test_expire_deactivates_once() {
    let mut alert = alert();
    assert!(TriggerStateTracker::expire(&mut alert));
    assert!(!alert.is_active);
    assert!(!TriggerStateTracker::expire(&mut alert));
}

#[test]
fn test_record_trigger_updates_state() {
    let now = test_now();
    let mut alert = alert();
    let event = TriggerStateTracker::record_trigger(&mut alert, now);

    assert_eq!(alert.trigger_count, 1);
    assert_eq!(alert.last_triggered, Some(now));
    assert!(alert.is_active);
    assert_eq!(event.alert_id, 1);
    assert_eq!(event.ticker, "AAPL");
    assert_eq!(event.threshold, 100.0);
    assert_eq!(event.triggered_at, now);

    TriggerStateTracker::record_trigger(&mut alert, now);
    assert_eq!(alert.trigger_count, 2);
}

#[test]
fn test_trigger_once_deactivates() {
    let mut alert = alert().with_options(AlertOptions {
        trigger_once: Some(true),
        ..AlertOptions::default()
    });
    TriggerStateTracker::record_trigger(&mut alert, test_now());
    assert!(!alert.is_active);
}

#[test]
fn test_cooldown_window() {
    let now = test_now();
    let mut alert = alert().with_options(AlertOptions {
        cooldown_minutes: Some(60),
        ..AlertOptions::default()
    });
    alert.last_triggered = Some(now - Duration::minutes(30));
    assert_eq!(TriggerStateTracker::decide(&alert, now), TriggerDecision::CoolingDown);

    alert.last_triggered = Some(now - Duration::minutes(61));
    assert_eq!(TriggerStateTracker::decide(&alert, now), TriggerDecision::Evaluate);
}

#[test]
fn test_expiry_takes_precedence_over_cooldown() {
    let now = test_now();
    let mut alert = alert()
        .with_expiry_date(now - Duration::days(1))
        .with_options(AlertOptions {
            cooldown_minutes: Some(60),
            ..AlertOptions::default()
        });
    alert.last_triggered = Some(now - Duration::minutes(5));
    assert_eq!(TriggerStateTracker::decide(&alert, now), TriggerDecision::Expired);
}
