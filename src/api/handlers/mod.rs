//! Endpoint handlers organized by resource.

pub mod live_tv;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().merge(live_tv::routes())
}
