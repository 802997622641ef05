//! Cron-based scheduler driving evaluation cycles

use crate::core::runtime::CycleOrchestrator;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(300);
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("scheduler disabled: interval_seconds is 0")]
    Disabled,
    #[error("invalid cron expression '{expr}': {message}")]
    InvalidCron { expr: String, message: String },
}

/// Runs one evaluation cycle per cron tick until stopped.
///
/// A cycle that exceeds the timeout is abandoned and the next tick proceeds
/// normally; ticks that fire while a cycle is still running are skipped.
pub struct CycleScheduler {
    orchestrator: Arc<CycleOrchestrator>,
    schedule: Schedule,
    cron_expr: String,
    cycle_timeout: Duration,
}

impl CycleScheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    /// * `orchestrator` - Runs each evaluation cycle
    /// * `interval_seconds` - Evaluation interval in seconds (0 = disabled)
    pub fn new(
        orchestrator: Arc<CycleOrchestrator>,
        interval_seconds: u64,
    ) -> Result<Self, SchedulerError> {
        if interval_seconds == 0 {
            return Err(SchedulerError::Disabled);
        }

        let cron_expr = Self::cron_expression_for(interval_seconds);
        let schedule = Schedule::from_str(&cron_expr).map_err(|e| SchedulerError::InvalidCron {
            expr: cron_expr.clone(),
            message: e.to_string(),
        })?;

        info!(
            interval = interval_seconds,
            cron = %cron_expr,
            "CycleScheduler: created with interval {}s (cron: {})",
            interval_seconds,
            cron_expr
        );

        Ok(Self {
            orchestrator,
            schedule,
            cron_expr,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
        })
    }

    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    /// Cron format: second minute hour day month weekday.
    ///
    /// Sub-minute intervals tick on seconds, whole hours on hours, everything
    /// else on minutes (rounded down).
    pub fn cron_expression_for(interval_seconds: u64) -> String {
        if interval_seconds < 60 {
            format!("*/{} * * * * *", interval_seconds)
        } else if interval_seconds >= 3600 {
            let hours = (interval_seconds / 3600).min(23);
            format!("0 0 */{} * * *", hours)
        } else {
            format!("0 */{} * * * *", interval_seconds / 60)
        }
    }

    pub fn cron_expression(&self) -> &str {
        &self.cron_expr
    }

    /// Spawn the cycle loop. The returned handle owns it: dropping the handle
    /// closes the shutdown channel, so the loop exits once any in-flight cycle
    /// finishes. Use [`SchedulerHandle::stop`] to also bound that wait.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let Self {
            orchestrator,
            schedule,
            cron_expr,
            cycle_timeout,
        } = self;

        let task = tokio::spawn(async move {
            info!("CycleScheduler: started, waiting for cron schedule...");

            loop {
                let wait = match schedule.upcoming(chrono::Utc).next() {
                    Some(next_tick) => (next_tick - chrono::Utc::now()).to_std().unwrap_or_default(),
                    None => Duration::from_secs(60),
                };

                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                info!("CycleScheduler: cron tick, running evaluation cycle");
                match tokio::time::timeout(cycle_timeout, orchestrator.run_cycle()).await {
                    Ok(summary) => {
                        info!(
                            checked = summary.checked_count,
                            triggered = summary.triggered_count,
                            errors = summary.error_count,
                            "CycleScheduler: cycle finished"
                        );
                    }
                    Err(_) => {
                        error!(
                            timeout_secs = cycle_timeout.as_secs(),
                            "CycleScheduler: cycle exceeded {}s timeout and was abandoned",
                            cycle_timeout.as_secs()
                        );
                    }
                }

                if *shutdown_rx.borrow() {
                    break;
                }
            }

            info!("CycleScheduler: loop exited");
        });

        info!(cron = %cron_expr, "CycleScheduler: started successfully");
        SchedulerHandle {
            task,
            shutdown,
            cron_expr,
        }
    }
}

/// Owned handle to a running scheduler loop
pub struct SchedulerHandle {
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
    cron_expr: String,
}

impl SchedulerHandle {
    pub fn cron_expression(&self) -> &str {
        &self.cron_expr
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop, letting an in-flight cycle finish within a short grace period
    pub async fn stop(self) {
        let Self {
            mut task, shutdown, ..
        } = self;

        let _ = shutdown.send(true);
        if tokio::time::timeout(STOP_GRACE_PERIOD, &mut task).await.is_err() {
            warn!("CycleScheduler: cycle still running after grace period, aborting");
            task.abort();
        }
        info!("CycleScheduler: stopped");
    }
}
