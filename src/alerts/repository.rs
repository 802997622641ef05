//! Alert storage interface and an in-memory implementation

use crate::models::alert::Alert;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("alert store unavailable: {0}")]
    Unavailable(String),

    #[error("could not load alerts from {path}: {message}")]
    Load { path: String, message: String },
}

/// Persistence owned by the CRUD layer. The engine only reads active alerts
/// and writes back trigger state, one alert at a time.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Alert>, RepositoryError>;

    async fn get(&self, id: i64) -> Result<Option<Alert>, RepositoryError>;

    /// Persist `last_triggered`, `trigger_count` and `is_active` only
    async fn save_trigger_state(&self, alert: &Alert) -> Result<(), RepositoryError>;
}

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<BTreeMap<i64, Alert>>,
}

impl InMemoryAlertRepository {
    pub fn new(alerts: Vec<Alert>) -> Self {
        Self {
            alerts: RwLock::new(alerts.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    /// Load a JSON array of alerts
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let load_err = |message: String| RepositoryError::Load {
            path: path.display().to_string(),
            message,
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_err(e.to_string()))?;
        let alerts: Vec<Alert> = serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))?;

        debug!(path = %path.display(), count = alerts.len(), "InMemoryAlertRepository: loaded {} alerts", alerts.len());
        Ok(Self::new(alerts))
    }

    pub async fn insert(&self, alert: Alert) {
        self.alerts.write().await.insert(alert.id, alert);
    }

    pub async fn snapshot(&self) -> Vec<Alert> {
        self.alerts.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn list_active(&self) -> Result<Vec<Alert>, RepositoryError> {
        Ok(self
            .alerts
            .read()
            .await
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Alert>, RepositoryError> {
        Ok(self.alerts.read().await.get(&id).cloned())
    }

    async fn save_trigger_state(&self, alert: &Alert) -> Result<(), RepositoryError> {
        let mut alerts = self.alerts.write().await;
        // the alert may have been deleted by the CRUD layer mid-cycle
        if let Some(stored) = alerts.get_mut(&alert.id) {
            stored.last_triggered = alert.last_triggered;
            stored.trigger_count = alert.trigger_count;
            stored.is_active = alert.is_active;
        }
        Ok(())
    }
}
