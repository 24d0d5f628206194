//! Page routes - full HTML page renders.

use axum::extract::State;
use std::sync::Arc;

use crate::state::AppState;
use crate::templates::IndexTemplate;

/// Landing page with the upload form.
pub async fn index(State(state): State<Arc<AppState>>) -> IndexTemplate {
    IndexTemplate::new(state.config.default_layout)
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
