use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyKind;
use crate::ingest::Transaction;

// ============================================================
// Request types
// ============================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInfo {
    pub kind: AnomalyKind,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChecksResponse {
    pub checks: Vec<CheckInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
