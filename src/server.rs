//! Control-plane HTTP server.
//!
//! `POST /run_load_test` runs one load test to completion and answers with a
//! [`JobResponse`]. `GET /health` is a liveness probe.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::loadtest::error::LoadTestError;
use crate::loadtest::job::{run_job, JobRequest, JobResponse};

/// Error answered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LoadTestError> for ApiError {
    fn from(err: LoadTestError) -> Self {
        match err {
            LoadTestError::ClientBuild { .. } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            },
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the control-plane router.
pub fn router() -> Router {
    Router::new()
        .route("/run_load_test", post(run_load_test))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve the control plane until Ctrl+C.
pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Load test control plane listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Control plane stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

async fn run_load_test(
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    info!(
        url = %request.url,
        num_requests = request.num_requests,
        concurrency = request.concurrency,
        "load test job received"
    );

    let response = run_job(request).await.map_err(|e| {
        tracing::warn!("rejected load test job: {e}");
        ApiError::from(e)
    })?;
    Ok(Json(response))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
