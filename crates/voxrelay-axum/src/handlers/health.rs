use axum::Json;
use axum::extract::State;

use crate::dto::HealthResponse;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.relay.health().await.into())
}
