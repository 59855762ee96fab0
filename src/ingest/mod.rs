//! Normalization of raw portal records into `Transaction`s.

pub mod loader;
pub mod types;

pub use loader::{cap_transactions, parse_transactions_csv, read_transactions_csv};
pub use types::Transaction;
