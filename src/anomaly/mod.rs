//! Heuristic fraud-pattern checks over a batch of spending records.
//!
//! Every check is a pure function of the batch. Results are advisory flags for a
//! human reviewer, not findings of fraud.

pub mod engine;
pub mod group;
pub mod outlier;
pub mod rules;
pub mod timing;
pub mod types;
pub mod vendor;

pub use engine::AnomalyEngine;
pub use types::{Anomaly, AnomalyKind, DetectionReport, DetectionStats, Severity};
