//! Shared application state injected into the diagnostic handlers.

use std::sync::Arc;

use crate::service::LiveTvService;

/// Shared state available to all handlers via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live-TV operations over the backend session.
    pub live_tv: Arc<LiveTvService>,
}
