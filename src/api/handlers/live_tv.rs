//! Live-TV projection handlers.
//!
//! Each request gets its own cancellation token; a timed-out read answers
//! with an empty list, like the service does.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;

use crate::app_state::AppState;

/// `GET /channels`
pub async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.live_tv.channels(&CancellationToken::new()).await)
}

/// `GET /recordings`
pub async fn list_recordings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.live_tv.recordings(&CancellationToken::new()).await)
}

/// `GET /timers`
pub async fn list_timers(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.live_tv.timers(&CancellationToken::new()).await)
}

/// `GET /series-timers`
pub async fn list_series_timers(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.live_tv.series_timers(&CancellationToken::new()).await)
}

/// `GET /tuners`
pub async fn list_tuners(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.live_tv.tuners(&CancellationToken::new()).await)
}

/// Live-TV routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(list_channels))
        .route("/recordings", get(list_recordings))
        .route("/timers", get(list_timers))
        .route("/series-timers", get(list_series_timers))
        .route("/tuners", get(list_tuners))
}
