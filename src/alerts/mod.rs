//! # Alert Evaluation Engine
//!
//! Consumes current/previous supply levels and a rule set, decides whether to
//! raise, update or clear an alert, and owns the deduplication/hysteresis
//! state machine behind an injected [`AlertStore`].

pub mod evaluator;
pub mod store;

pub use evaluator::{AlertEvaluator, AlertEvent, AlertEventKind, AlertQuery, EvaluationContext};
pub use store::{AlertStore, InMemoryAlertStore};
