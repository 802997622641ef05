//! Shared data models spanning the engine layers.

pub mod alert;
pub mod cycle;
pub mod indicators;
pub mod market;

pub use alert::{
    Alert, AlertCondition, AlertOptions, AlertType, ConditionView, SubCondition, TrailFrom,
    TriggerEvent,
};
pub use cycle::{AlertCheckOutcome, CycleSummary};
pub use indicators::{
    DivergenceAnalysis, DivergencePoint, DivergencePoints, MaCrossSnapshot,
};
pub use market::{Candle, ExtendedData, FastQuote, HistoricalSeries, Interval};
