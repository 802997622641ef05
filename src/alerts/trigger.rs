//! Trigger-state bookkeeping: expiry, cooldown and trigger recording.
//!
//! Alerts are level-triggered by default and fire again every cycle while
//! their condition holds. `cooldown_minutes` and `trigger_once` opt into
//! debouncing.

use crate::models::alert::{Alert, TriggerEvent};
use chrono::{DateTime, Duration, Utc};

/// What the cycle should do with an alert before evaluating it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Past its expiry date: deactivate, do not count
    Expired,
    /// Fired too recently: counts as checked, not evaluated
    CoolingDown,
    Evaluate,
}

pub struct TriggerStateTracker;

impl TriggerStateTracker {
    pub fn decide(alert: &Alert, now: DateTime<Utc>) -> TriggerDecision {
        if Self::is_expired(alert, now) {
            TriggerDecision::Expired
        } else if Self::in_cooldown(alert, now) {
            TriggerDecision::CoolingDown
        } else {
            TriggerDecision::Evaluate
        }
    }

    pub fn is_expired(alert: &Alert, now: DateTime<Utc>) -> bool {
        alert.expiry_date.is_some_and(|expiry| expiry < now)
    }

    pub fn in_cooldown(alert: &Alert, now: DateTime<Utc>) -> bool {
        match (alert.options.cooldown_minutes, alert.last_triggered) {
            (Some(minutes), Some(last)) if minutes > 0 => now - last < Duration::minutes(minutes),
            _ => false,
        }
    }

    /// Deactivate. Returns whether the alert was active before.
    pub fn expire(alert: &mut Alert) -> bool {
        std::mem::replace(&mut alert.is_active, false)
    }

    /// Record a trigger at `now` and build the event for the caller
    pub fn record_trigger(alert: &mut Alert, now: DateTime<Utc>) -> TriggerEvent {
        alert.last_triggered = Some(now);
        alert.trigger_count = alert.trigger_count.saturating_add(1);
        if alert.options.trigger_once.unwrap_or(false) {
            alert.is_active = false;
        }

        TriggerEvent {
            alert_id: alert.id,
            ticker: alert.ticker.clone(),
            alert_type: alert.alert_type.clone(),
            condition: alert.condition,
            threshold: alert.threshold_value,
            triggered_at: now,
        }
    }
}
