//! Technical indicators computed from fetched history.

pub mod divergence;
pub mod momentum;
pub mod trend;

pub use divergence::{DivergenceConfig, DivergenceDetector};
