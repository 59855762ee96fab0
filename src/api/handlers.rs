use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use crate::anomaly::{AnomalyKind, DetectionReport};
use crate::export;

use super::types::*;
use super::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

fn run_detection(state: &AppState, request: &DetectRequest) -> Result<DetectionReport, ApiError> {
    let count = request.transactions.len();
    if count > state.max_transactions {
        return Err(api_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "{} transactions exceeds the limit of {}",
                count, state.max_transactions
            ),
        ));
    }
    Ok(state.engine.analyze(&request.transactions))
}

// ============================================================
// Health & Checks
// ============================================================

pub async fn health() -> ApiResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub async fn checks(State(state): State<Arc<AppState>>) -> ApiResult<ChecksResponse> {
    let config = state.engine.config();
    let checks = AnomalyKind::ALL
        .into_iter()
        .map(|kind| CheckInfo {
            kind,
            enabled: config.is_enabled(kind),
        })
        .collect();
    Ok(Json(ChecksResponse { checks }))
}

// ============================================================
// Detection
// ============================================================

pub async fn detect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectRequest>,
) -> ApiResult<DetectionReport> {
    run_detection(&state, &request).map(Json)
}

pub async fn detect_csv(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = run_detection(&state, &request)?;

    let mut body = Vec::new();
    export::write_anomalies_csv(&mut body, &report.anomalies)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"anomalies.csv\"",
            ),
        ],
        body,
    ))
}
