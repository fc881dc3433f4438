//! System endpoints: health check and backend status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::BridgeError;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    ready: bool,
}

/// `GET /health`: bridge liveness and whether the initial load is in.
///
/// Never touches the backend.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ready: state.live_tv.session().is_ready(),
        }),
    )
}

/// `GET /status`: backend identification and disk usage.
///
/// # Errors
///
/// Returns [`BridgeError`] if the backend cannot be reached.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, BridgeError> {
    let status = state.live_tv.server_status().await?;
    Ok((StatusCode::OK, Json(status)))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
}
