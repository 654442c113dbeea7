//! Conversation history handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use voxrelay_core::{Conversation, Message};

use crate::dto::{AudioFragmentResponse, CreateConversationRequest};
use crate::error::HttpError;
use crate::state::AppState;

/// GET /conversations
pub async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Conversation>>, HttpError> {
    Ok(Json(state.history.list_conversations().await?))
}

/// POST /conversations
///
/// The body is optional; a missing or blank title gets the default.
pub async fn create_conversation(
    State(state): State<AppState>,
    body: Option<Json<CreateConversationRequest>>,
) -> Result<(StatusCode, Json<Conversation>), HttpError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let id = state.history.create_conversation(req.title).await?;
    let conversation = state.history.get_conversation(id).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /conversations/{id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Conversation>, HttpError> {
    Ok(Json(state.history.get_conversation(id).await?))
}

/// DELETE /conversations/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.history.delete_conversation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /conversations/{id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Message>>, HttpError> {
    Ok(Json(state.history.get_messages(id).await?))
}

/// GET /messages/{id}/audio
pub async fn get_audio(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AudioFragmentResponse>>, HttpError> {
    let fragments = state.history.get_fragments(id).await?;
    Ok(Json(fragments.into_iter().map(Into::into).collect()))
}
