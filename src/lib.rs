//! Alert evaluation engine for market watch conditions.
//!
//! One evaluation cycle loads the active alerts, batch-prefetches market data
//! per ticker, evaluates every alert and records trigger state.

pub mod alerts;
pub mod common;
pub mod config;
pub mod core;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
