//! Health handler.

use axum::Json;
use axum::extract::State;
use tracing::debug;

use crate::dto::HealthResponse;
use crate::state::AppState;

/// Report backend health. Always 200; an unhealthy backend is `degraded`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.backend.check_health().await;
    let server_state = state.backend.state();
    debug!(healthy = health.is_healthy(), state = %server_state, "GET /health");
    Json(HealthResponse::from_status(health, server_state))
}
