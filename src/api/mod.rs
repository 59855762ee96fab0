pub mod handlers;
pub mod types;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::anomaly::AnomalyEngine;

/// Request-body allowance per transaction. Portal records with a description
/// run a few hundred bytes of JSON.
const BYTES_PER_TRANSACTION: usize = 1024;
/// Allowance for the request envelope on top of the records.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: AnomalyEngine,
    pub max_transactions: usize,
}

/// Largest request body accepted for a batch of `max_transactions` records.
pub fn body_limit(max_transactions: usize) -> usize {
    max_transactions
        .saturating_mul(BYTES_PER_TRANSACTION)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

pub fn router(state: AppState) -> Router {
    let limit = body_limit(state.max_transactions);
    let state = Arc::new(state);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/checks", get(handlers::checks))
        .route("/api/v1/detect", post(handlers::detect))
        .route("/api/v1/detect/csv", post(handlers::detect_csv))
        .with_state(state)
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre::eyre!("Failed to bind API server to {}: {}", addr, e))?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("API server stopped");
    Ok(())
}

/// Serve until `signal` resolves or the server stops on its own.
/// A server failure (e.g. the port is taken) is returned, not swallowed.
pub async fn run<F>(state: AppState, host: &str, port: u16, signal: F) -> eyre::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let shutdown = CancellationToken::new();
    let mut server = {
        let shutdown = shutdown.clone();
        let host = host.to_string();
        tokio::spawn(async move { serve(state, &host, port, shutdown).await })
    };

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| eyre::eyre!("API server task panicked: {}", e))??;
            Err(eyre::eyre!("API server exited unexpectedly"))
        }
        signal = signal => {
            signal?;
            tracing::info!("Shutdown signal received, stopping API server...");
            shutdown.cancel();
            server
                .await
                .map_err(|e| eyre::eyre!("API server task panicked: {}", e))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyKind, DetectionReport};
    use crate::config::DetectionConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn test_app(max_transactions: usize) -> Router {
        let mut config = DetectionConfig::default();
        config.disabled = vec!["vendor_name_flag".to_string()];
        router(AppState {
            engine: AnomalyEngine::new(config),
            max_transactions,
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn split_payments() -> serde_json::Value {
        json!({
            "transactions": [
                {"department": "Parks", "vendor": "Acme LLC", "amount": 9950, "date": "2024-03-04"},
                {"department": "Parks", "vendor": "Acme LLC", "amount": "9,950.00", "date": "2024-03-06"},
                {"department": "Parks", "vendor": "Acme LLC", "amount": 9950.0, "date": "2024-03-08"}
            ]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let response = test_app(10).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_checks_lists_disabled() {
        let request = Request::builder()
            .uri("/api/v1/checks")
            .body(Body::empty())
            .unwrap();
        let response = test_app(10).oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: types::ChecksResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.checks.len(), 10);
        let name_check = body
            .checks
            .iter()
            .find(|c| c.kind == AnomalyKind::VendorNameFlag)
            .unwrap();
        assert!(!name_check.enabled);
    }

    #[tokio::test]
    async fn test_detect() {
        let response = test_app(10)
            .oneshot(post_json("/api/v1/detect", split_payments()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: DetectionReport = serde_json::from_slice(&bytes).unwrap();
        assert!(report
            .of_kind(AnomalyKind::ThresholdAvoidance)
            .any(|a| a.vendor.as_deref() == Some("Acme LLC")));
        assert_eq!(report.stats.transactions_analyzed, 3);
    }

    #[tokio::test]
    async fn test_detect_too_many_transactions() {
        let response = test_app(2)
            .oneshot(post_json("/api/v1/detect", split_payments()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_detect_rejects_malformed_body() {
        let response = test_app(10)
            .oneshot(post_json("/api/v1/detect", json!({"transactions": "nope"})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_detect_csv() {
        let response = test_app(10)
            .oneshot(post_json("/api/v1/detect/csv", split_payments()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("id,severity,kind"));
        assert!(text.contains("threshold_avoidance"));
    }

    #[tokio::test]
    async fn test_detect_accepts_full_batch() {
        let transactions: Vec<serde_json::Value> = (0..10_000)
            .map(|i| {
                json!({
                    "department": "Department of Transportation and Public Works",
                    "vendor": format!("Regional Construction and Paving Contractors {}", i % 400),
                    "amount": format!("${}.{:02}", 1_000 + (i * 37) % 90_000, i % 100),
                    "date": format!("2024-{:02}-{:02}T10:15:00.000", 1 + i % 12, 1 + i % 28),
                    "description": "Road resurfacing, materials and labor per contract"
                })
            })
            .collect();
        let body = json!({ "transactions": transactions });
        assert!(body.to_string().len() > 2 * 1024 * 1024);

        let response = test_app(10_000)
            .oneshot(post_json("/api/v1/detect", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: DetectionReport = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report.stats.transactions_analyzed, 10_000);
    }

    #[test]
    fn test_body_limit_scales_with_cap() {
        assert!(body_limit(10_000) >= 10_000 * 1024);
        assert!(body_limit(1) < body_limit(2));
        assert_eq!(body_limit(usize::MAX), usize::MAX);
    }

    #[tokio::test]
    async fn test_run_reports_bind_failure() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let state = AppState {
            engine: AnomalyEngine::default(),
            max_transactions: 10,
        };

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            run(state, "127.0.0.1", port, std::future::pending()),
        )
        .await
        .expect("run should return once the server fails");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_signal() {
        let state = AppState {
            engine: AnomalyEngine::default(),
            max_transactions: 10,
        };
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            run(state, "127.0.0.1", 0, async { Ok(()) }),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
    }
}
