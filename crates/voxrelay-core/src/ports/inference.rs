//! Inference port: streaming chat against a language-model backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use thiserror::Error;

use crate::domain::chat::PromptMessage;

/// Errors reported by the inference backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Inference backend unreachable: {0}")]
    Unavailable(String),

    #[error("Inference backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Inference backend error: {0}")]
    Backend(String),

    #[error("Inference stream broke off: {0}")]
    Protocol(String),

    #[error("Inference request timed out")]
    Timeout,
}

/// One item of a streaming inference response.
///
/// Failures arrive as a terminal [`InferenceEvent::Error`] item rather than
/// as a `Result`, so consumers drive a single stream type end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceEvent {
    Delta { text: String, done: bool },
    Error(InferenceError),
}

impl InferenceEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        Self::Delta {
            text: text.into(),
            done: false,
        }
    }

    pub fn done(text: impl Into<String>) -> Self {
        Self::Delta {
            text: text.into(),
            done: true,
        }
    }
}

/// A lazy, non-restartable sequence of inference events.
pub type InferenceStream = Pin<Box<dyn Stream<Item = InferenceEvent> + Send>>;

#[async_trait]
pub trait InferencePort: Send + Sync {
    /// Open a streaming chat call over `history`.
    ///
    /// The request is issued when the stream is first polled. Dropping the
    /// stream aborts the call.
    fn stream_chat(&self, history: Vec<PromptMessage>) -> InferenceStream;

    /// Whether the backend currently answers requests.
    async fn health_check(&self) -> bool;
}
