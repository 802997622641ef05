//! Market data gateway interface consumed by the alert engine.

use crate::models::market::{ExtendedData, FastQuote, HistoricalSeries, Interval};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("request failed for {ticker}: {message}")]
    Request { ticker: String, message: String },

    #[error("unexpected status {status} for {ticker}")]
    Status { ticker: String, status: u16 },

    #[error("could not decode response for {ticker}: {message}")]
    Decode { ticker: String, message: String },

    #[error("no data returned for {ticker}")]
    Empty { ticker: String },
}

/// Source of quotes, ratios and history. Every call may fail independently.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Current price and volume snapshot
    async fn fast_quote(&self, ticker: &str) -> Result<FastQuote, GatewayError>;

    /// Valuation and volatility ratios
    async fn extended_data(&self, ticker: &str) -> Result<ExtendedData, GatewayError>;

    /// Bars covering the last `lookback_days` calendar days, oldest first
    async fn history(
        &self,
        ticker: &str,
        lookback_days: u32,
        interval: Interval,
    ) -> Result<HistoricalSeries, GatewayError>;

    /// Next scheduled earnings date, if the provider knows one
    async fn next_earnings_date(&self, ticker: &str) -> Result<Option<NaiveDate>, GatewayError>;
}
