//! Alert evaluation: prefetch, condition dispatch, composites and trigger state.

pub mod composite;
pub mod conditions;
pub mod error;
pub mod evaluator;
pub mod prefetch;
pub mod repository;
pub mod trigger;

pub use composite::CompositeEvaluator;
pub use error::AlertError;
pub use evaluator::{ConditionCheck, ConditionEvaluator, EvaluationContext, Oscillator};
pub use prefetch::{BatchPrefetcher, FetchCounts, PrefetchOptions, TickerBundle};
pub use repository::{AlertRepository, InMemoryAlertRepository, RepositoryError};
pub use trigger::{TriggerDecision, TriggerStateTracker};
