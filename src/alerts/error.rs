use crate::alerts::repository::RepositoryError;
use crate::services::market_data::GatewayError;
use thiserror::Error;

/// Failure to evaluate a single alert. Never aborts a cycle.
///
/// Too little history for an indicator is not an error: the condition is
/// simply false.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("market data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("alert {0} not found")]
    NotFound(i64),

    #[error("alert {0} is inactive")]
    Inactive(i64),

    #[error("alert {0} has expired")]
    Expired(i64),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("evaluation panicked: {0}")]
    Panicked(String),
}

impl AlertError {
    pub fn data_unavailable(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        AlertError::DataUnavailable {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }
}

impl From<GatewayError> for AlertError {
    fn from(err: GatewayError) -> Self {
        let ticker = match &err {
            GatewayError::Request { ticker, .. }
            | GatewayError::Status { ticker, .. }
            | GatewayError::Decode { ticker, .. }
            | GatewayError::Empty { ticker } => ticker.clone(),
        };
        AlertError::DataUnavailable {
            ticker,
            reason: err.to_string(),
        }
    }
}

impl From<RepositoryError> for AlertError {
    fn from(err: RepositoryError) -> Self {
        AlertError::Repository(err.to_string())
    }
}
