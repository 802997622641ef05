//! Per-cycle batch prefetch of market data
//!
//! Alerts are grouped by ticker so each distinct ticker's fast quote (and,
//! when some alert needs it, its extended data) is fetched once per cycle no
//! matter how many alerts reference it. A failed fetch only affects alerts on
//! that ticker. History is fetched lazily per alert and, unless disabled,
//! shared between alerts asking for the same `(ticker, lookback)` window.
//! Nothing outlives the prefetcher, so every cycle starts from fresh data.

use crate::alerts::error::AlertError;
use crate::models::alert::Alert;
use crate::models::market::{ExtendedData, FastQuote, HistoricalSeries, Interval};
use crate::services::market_data::{GatewayError, MarketDataGateway};
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

pub const DEFAULT_PREFETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchOptions {
    /// Distinct tickers fetched in parallel
    pub concurrency: usize,
    /// Share history fetches keyed on (ticker, lookback) within the cycle
    pub dedupe_history: bool,
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            dedupe_history: true,
        }
    }
}

/// Data shared by every alert on one ticker for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct TickerBundle {
    pub fast_quote: FastQuote,
    pub extended: Option<ExtendedData>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TickerDemand {
    alerts: usize,
    needs_extended: bool,
    needs_earnings: bool,
}

/// Gateway calls issued by one prefetcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounts {
    pub fast_quotes: usize,
    pub extended: usize,
    pub earnings: usize,
    pub history: usize,
}

#[derive(Debug, Default)]
struct FetchStats {
    fast_quotes: AtomicUsize,
    extended: AtomicUsize,
    earnings: AtomicUsize,
    history: AtomicUsize,
}

impl FetchStats {
    fn snapshot(&self) -> FetchCounts {
        FetchCounts {
            fast_quotes: self.fast_quotes.load(Ordering::Relaxed),
            extended: self.extended.load(Ordering::Relaxed),
            earnings: self.earnings.load(Ordering::Relaxed),
            history: self.history.load(Ordering::Relaxed),
        }
    }
}

type HistoryKey = (String, u32);
type HistorySlot = Arc<OnceCell<Result<Arc<HistoricalSeries>, AlertError>>>;

pub struct BatchPrefetcher {
    gateway: Arc<dyn MarketDataGateway>,
    options: PrefetchOptions,
    bundles: HashMap<String, TickerBundle>,
    failures: HashMap<String, String>,
    history: Mutex<HashMap<HistoryKey, HistorySlot>>,
    stats: FetchStats,
}

impl BatchPrefetcher {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, options: PrefetchOptions) -> Self {
        Self {
            gateway,
            options,
            bundles: HashMap::new(),
            failures: HashMap::new(),
            history: Mutex::new(HashMap::new()),
            stats: FetchStats::default(),
        }
    }

    /// Fetch bundles for every distinct ticker referenced by `alerts`.
    ///
    /// Tickers already resolved by an earlier call are not fetched again.
    pub async fn prefetch(&mut self, alerts: &[Alert]) {
        let demand: BTreeMap<String, TickerDemand> = group_by_ticker(alerts)
            .into_iter()
            .filter(|(ticker, _)| {
                !self.bundles.contains_key(ticker) && !self.failures.contains_key(ticker)
            })
            .collect();

        if demand.is_empty() {
            return;
        }

        debug!(
            tickers = demand.len(),
            alerts = alerts.len(),
            "BatchPrefetcher: fetching {} tickers for {} alerts",
            demand.len(),
            alerts.len()
        );

        let gateway = self.gateway.as_ref();
        let stats = &self.stats;
        let results: Vec<(String, Result<TickerBundle, GatewayError>)> = stream::iter(demand)
            .map(|(ticker, need)| async move {
                let result = fetch_ticker(gateway, stats, &ticker, need).await;
                (ticker, result)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for (ticker, result) in results {
            match result {
                Ok(bundle) => {
                    self.bundles.insert(ticker, bundle);
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "BatchPrefetcher: fetch failed for {}, its alerts will be skipped", ticker);
                    self.failures.insert(ticker, e.to_string());
                }
            }
        }
    }

    /// Prefetched bundle, or `DataUnavailable` when the ticker failed or was never requested
    pub fn bundle(&self, ticker: &str) -> Result<&TickerBundle, AlertError> {
        if let Some(bundle) = self.bundles.get(ticker) {
            return Ok(bundle);
        }
        let reason = self
            .failures
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| "ticker was not prefetched".to_string());
        Err(AlertError::data_unavailable(ticker, reason))
    }

    /// Daily history covering `lookback_days`, fetched on first use
    pub async fn history(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Arc<HistoricalSeries>, AlertError> {
        if !self.options.dedupe_history {
            return self.fetch_history(ticker, lookback_days).await;
        }

        let slot = {
            let mut cache = self.history.lock().await;
            cache
                .entry((ticker.to_string(), lookback_days))
                .or_default()
                .clone()
        };

        slot.get_or_init(|| self.fetch_history(ticker, lookback_days))
            .await
            .clone()
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Arc<HistoricalSeries>, AlertError> {
        self.stats.history.fetch_add(1, Ordering::Relaxed);
        debug!(ticker = %ticker, lookback_days, "BatchPrefetcher: fetching {} days of history for {}", lookback_days, ticker);
        self.gateway
            .history(ticker, lookback_days, Interval::Daily)
            .await
            .map(Arc::new)
            .map_err(AlertError::from)
    }

    pub fn failed_tickers(&self) -> impl Iterator<Item = &str> {
        self.failures.keys().map(String::as_str)
    }

    pub fn fetch_counts(&self) -> FetchCounts {
        self.stats.snapshot()
    }
}

fn group_by_ticker(alerts: &[Alert]) -> BTreeMap<String, TickerDemand> {
    let mut demand: BTreeMap<String, TickerDemand> = BTreeMap::new();
    for alert in alerts {
        let entry = demand.entry(alert.ticker.clone()).or_default();
        entry.alerts += 1;
        entry.needs_extended |= alert.needs_extended_data();
        entry.needs_earnings |= alert.needs_earnings_date();
    }
    demand
}

async fn fetch_ticker(
    gateway: &dyn MarketDataGateway,
    stats: &FetchStats,
    ticker: &str,
    need: TickerDemand,
) -> Result<TickerBundle, GatewayError> {
    stats.fast_quotes.fetch_add(1, Ordering::Relaxed);
    let fast_quote = gateway.fast_quote(ticker).await?;

    let extended = if need.needs_extended {
        stats.extended.fetch_add(1, Ordering::Relaxed);
        let mut data = gateway.extended_data(ticker).await?;

        if need.needs_earnings && data.next_earnings_date.is_none() {
            stats.earnings.fetch_add(1, Ordering::Relaxed);
            match gateway.next_earnings_date(ticker).await {
                Ok(date) => data.next_earnings_date = date,
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "BatchPrefetcher: earnings date lookup failed for {}", ticker);
                }
            }
        }
        Some(data)
    } else {
        None
    };

    debug!(ticker = %ticker, alerts = need.alerts, extended = extended.is_some(), "BatchPrefetcher: fetched {}", ticker);
    Ok(TickerBundle {
        fast_quote,
        extended,
    })
}
