use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use tunematch_shared::errors::{AppError, AppResult};
use tunematch_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = match state.store.ping() {
        Ok(()) => HealthCheck::healthy(state.store.backend()),
        Err(e) => HealthCheck::failing(state.store.backend(), HealthStatus::Unhealthy, e.to_string()),
    };
    // A cursor backend outage is degraded, not unhealthy.
    let cursors = match state.cursors.ping().await {
        Ok(()) => HealthCheck::healthy(format!("cursors:{}", state.cursors.backend())),
        Err(e) => HealthCheck::failing(
            format!("cursors:{}", state.cursors.backend()),
            HealthStatus::Degraded,
            e.to_string(),
        ),
    };

    Json(
        HealthResponse::healthy("tunematch-api", env!("CARGO_PKG_VERSION"))
            .with_checks(vec![store, cursors]),
    )
}

// --- GET /metrics ---

pub async fn metrics(State(state): State<Arc<AppState>>) -> AppResult<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::not_found("metrics are disabled"))
}
