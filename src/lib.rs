//! spendwatch: heuristic fraud-pattern detection over public spending records.
//!
//! Records fetched from city, state or federal open-data portals are normalized
//! into [`ingest::Transaction`]s and run through [`anomaly::AnomalyEngine`], which
//! returns advisory flags plus summary statistics.

pub mod anomaly;
pub mod api;
pub mod config;
pub mod export;
pub mod ingest;
