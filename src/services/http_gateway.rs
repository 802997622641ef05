//! JSON-over-HTTP market data gateway

use crate::models::market::{Candle, ExtendedData, FastQuote, HistoricalSeries, Interval};
use crate::services::market_data::{GatewayError, MarketDataGateway};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    bars: Vec<Candle>,
}

#[derive(Debug, Deserialize)]
struct EarningsResponse {
    #[serde(default)]
    next_earnings_date: Option<NaiveDate>,
}

/// Gateway backed by a quote service exposing
/// `/quote/{t}`, `/ratios/{t}`, `/history/{t}` and `/earnings/{t}`.
pub struct HttpMarketDataGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMarketDataGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Request {
                ticker: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        ticker: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}/{}/{}", self.base_url, path, ticker);
        debug!(ticker = %ticker, url = %url, "HttpMarketDataGateway: GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Request {
                ticker: ticker.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                ticker: ticker.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| GatewayError::Decode {
            ticker: ticker.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MarketDataGateway for HttpMarketDataGateway {
    async fn fast_quote(&self, ticker: &str) -> Result<FastQuote, GatewayError> {
        self.get_json(ticker, "quote", &[]).await
    }

    async fn extended_data(&self, ticker: &str) -> Result<ExtendedData, GatewayError> {
        self.get_json(ticker, "ratios", &[]).await
    }

    async fn history(
        &self,
        ticker: &str,
        lookback_days: u32,
        interval: Interval,
    ) -> Result<HistoricalSeries, GatewayError> {
        let query = [
            ("days", lookback_days.to_string()),
            ("interval", interval.as_str().to_string()),
        ];
        let response: HistoryResponse = self.get_json(ticker, "history", &query).await?;
        if response.bars.is_empty() {
            return Err(GatewayError::Empty {
                ticker: ticker.to_string(),
            });
        }
        Ok(HistoricalSeries::new(ticker, response.bars))
    }

    async fn next_earnings_date(&self, ticker: &str) -> Result<Option<NaiveDate>, GatewayError> {
        let response: EarningsResponse = self.get_json(ticker, "earnings", &[]).await?;
        Ok(response.next_earnings_date)
    }
}
