//! Environment-driven configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file by the binaries via `dotenvy`.

use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// `ENVIRONMENT`, defaulting to `sandbox`
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

pub fn is_production() -> bool {
    matches!(get_environment().as_str(), "production" | "prod")
}

/// Base URL of the quote service (`MARKET_DATA_URL`)
pub fn get_market_data_url() -> Result<String, ConfigError> {
    env::var("MARKET_DATA_URL").map_err(|_| ConfigError::Missing("MARKET_DATA_URL".to_string()))
}

/// JSON file seeding the in-memory alert store (`ALERTS_FILE`)
pub fn get_alerts_file() -> Result<String, ConfigError> {
    env::var("ALERTS_FILE").map_err(|_| ConfigError::Missing("ALERTS_FILE".to_string()))
}

/// Parse `key` if set, otherwise return `default`
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

pub fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
