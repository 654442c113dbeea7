use axum::Json;
use axum::extract::State;

use crate::dto::VoicesResponse;
use crate::state::AppState;

/// GET /voices
pub async fn list(State(state): State<AppState>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: state.relay.voices(),
        default_voice: state.relay.settings().default_voice.clone(),
    })
}
