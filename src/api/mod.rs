//! Read-only diagnostic router over the Live-TV service.
//!
//! Projections are mounted under `/api/v1`; `/health` and `/status` sit at
//! the root. The host decides whether to serve it.

pub mod handlers;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the diagnostic router with request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
