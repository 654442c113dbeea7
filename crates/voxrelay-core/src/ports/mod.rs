//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx`, `reqwest` or `axum` types in any signature
//! - Repository traits are minimal single-record operations
//! - Streaming ports return lazy streams; failures are stream items

pub mod audio_fragments;
pub mod chat_history;
pub mod inference;
pub mod synthesis;

use std::sync::Arc;
use thiserror::Error;

pub use audio_fragments::AudioFragmentRepository;
pub use chat_history::{ChatHistoryRepository, validate_role};
pub use inference::{InferenceError, InferenceEvent, InferencePort, InferenceStream};
pub use synthesis::{SpeechSynthesizer, SynthesisError};

/// Errors raised by the entity store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(i64),

    #[error("Message not found: {0}")]
    MessageNotFound(i64),

    #[error("Invalid message role: {0}")]
    InvalidRole(String),

    #[error("Fragment {sequence_index} of message {message_id} already stored")]
    DuplicateFragment { message_id: i64, sequence_index: u32 },

    #[error("Database error: {0}")]
    Database(String),
}

/// Container for all repository trait objects.
///
/// Lets adapters wire storage without depending on the concrete database
/// crate.
#[derive(Clone)]
pub struct Repos {
    pub chat_history: Arc<dyn ChatHistoryRepository>,
    pub audio_fragments: Arc<dyn AudioFragmentRepository>,
}

impl Repos {
    pub fn new(
        chat_history: Arc<dyn ChatHistoryRepository>,
        audio_fragments: Arc<dyn AudioFragmentRepository>,
    ) -> Self {
        Self {
            chat_history,
            audio_fragments,
        }
    }
}
