//! Outputs of a full evaluation cycle and of a single-alert check

use crate::models::alert::TriggerEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub checked_count: usize,
    pub triggered_count: usize,
    pub error_count: usize,
    pub triggered_alerts: Vec<TriggerEvent>,
    pub timestamp: DateTime<Utc>,
}

impl CycleSummary {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            checked_count: 0,
            triggered_count: 0,
            error_count: 0,
            triggered_alerts: Vec::new(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertCheckOutcome {
    Checked {
        alert_id: i64,
        is_triggered: bool,
        checked_at: DateTime<Utc>,
        trigger_count: u32,
    },
    Failed {
        alert_id: i64,
        error: String,
    },
}

impl AlertCheckOutcome {
    pub fn alert_id(&self) -> i64 {
        match self {
            AlertCheckOutcome::Checked { alert_id, .. } => *alert_id,
            AlertCheckOutcome::Failed { alert_id, .. } => *alert_id,
        }
    }
}
