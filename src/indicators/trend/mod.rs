//! Trend indicators: moving-average crosses

pub mod sma;

pub use sma::*;
