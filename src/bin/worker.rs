//! Alertwatch Worker
//!
//! Loads alerts, then evaluates them against live market data on a fixed
//! schedule until interrupted.

use alertwatch::alerts::repository::{AlertRepository, InMemoryAlertRepository};
use alertwatch::config;
use alertwatch::core::runtime::{CycleOrchestrator, RuntimeConfig};
use alertwatch::core::scheduler::CycleScheduler;
use alertwatch::logging;
use alertwatch::metrics::Metrics;
use alertwatch::services::http_gateway::HttpMarketDataGateway;
use alertwatch::services::market_data::MarketDataGateway;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging("info");

    let env = config::get_environment();
    info!("Starting Alertwatch Worker");
    info!(environment = %env, "Environment");

    let runtime_config = RuntimeConfig::from_env()?;
    info!(
        interval = runtime_config.evaluation_interval_seconds,
        concurrency = runtime_config.prefetch_concurrency,
        timeout = runtime_config.cycle_timeout_seconds,
        "Alert evaluation: every {} seconds",
        runtime_config.evaluation_interval_seconds
    );

    let metrics = Arc::new(Metrics::new()?);

    let alerts_file = config::get_alerts_file()?;
    info!(path = %alerts_file, "Loading alerts...");
    let repository = InMemoryAlertRepository::from_json_file(&alerts_file).await?;
    let active = repository.list_active().await?.len();
    if active == 0 {
        warn!("No active alerts loaded - cycles will run but nothing will be evaluated");
    } else {
        info!(alert_count = active, "Loaded {} active alerts", active);
    }
    let repository: Arc<dyn AlertRepository> = Arc::new(repository);

    let market_data_url = config::get_market_data_url()?;
    info!(url = %market_data_url, "Initializing market data gateway...");
    let gateway: Arc<dyn MarketDataGateway> = Arc::new(HttpMarketDataGateway::new(&market_data_url)?);

    let orchestrator = Arc::new(
        CycleOrchestrator::new(repository, gateway, runtime_config.clone())
            .with_metrics(metrics.clone()),
    );

    info!("Starting cycle scheduler...");
    let scheduler = CycleScheduler::new(orchestrator, runtime_config.evaluation_interval_seconds)?
        .with_cycle_timeout(runtime_config.cycle_timeout());
    let handle = scheduler.start();

    // Graceful shutdown
    info!("Worker started, waiting for shutdown signal...");
    signal::ctrl_c().await?;
    info!("Shutting down worker...");
    handle.stop().await;

    match metrics.export() {
        Ok(text) => info!(metrics = %text, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to export metrics"),
    }
    info!("Worker stopped");

    Ok(())
}
