//! HTTP error type and mappings from core errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use voxrelay_core::{RelayError, SessionError, StorageError};

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let error = match self {
            Self::NotFound(msg) | Self::BadRequest(msg) | Self::Conflict(msg) | Self::Internal(msg) => msg,
        };
        let body = ErrorBody {
            error,
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConversationNotFound(_) | StorageError::MessageNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            StorageError::InvalidRole(_) => Self::BadRequest(err.to_string()),
            StorageError::DuplicateFragment { .. } => Self::Conflict(err.to_string()),
            StorageError::Database(msg) => Self::Internal(format!("Database error: {msg}")),
        }
    }
}

impl From<RelayError> for HttpError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::EmptyContent | RelayError::UnknownVoice(_) => {
                Self::BadRequest(err.to_string())
            }
            RelayError::Session(SessionError::AlreadyConnected(_)) => Self::Conflict(err.to_string()),
            RelayError::Session(SessionError::NotConnected(_)) => Self::NotFound(err.to_string()),
            RelayError::Storage(storage) => storage.into(),
        }
    }
}
