//! Chat history service - thin read/write facade for the HTTP API.
//!
//! Delegates all persistence to the repository ports and turns missing
//! parents into explicit not-found errors.

use std::sync::Arc;

use crate::domain::audio::AudioFragment;
use crate::domain::chat::{Conversation, Message, NewConversation};
use crate::ports::{AudioFragmentRepository, ChatHistoryRepository, Repos, StorageError};

/// Title used when a conversation is created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

pub struct ChatHistoryService {
    chats: Arc<dyn ChatHistoryRepository>,
    fragments: Arc<dyn AudioFragmentRepository>,
}

impl ChatHistoryService {
    pub fn new(repos: &Repos) -> Self {
        Self {
            chats: Arc::clone(&repos.chat_history),
            fragments: Arc::clone(&repos.audio_fragments),
        }
    }

    /// Create a conversation. Blank titles fall back to the default.
    pub async fn create_conversation(&self, title: Option<String>) -> Result<i64, StorageError> {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_string());
        self.chats
            .create_conversation(NewConversation { title })
            .await
    }

    /// List all conversations, most recently active first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, StorageError> {
        self.chats.list_conversations().await
    }

    pub async fn get_conversation(&self, id: i64) -> Result<Conversation, StorageError> {
        self.chats
            .get_conversation(id)
            .await?
            .ok_or(StorageError::ConversationNotFound(id))
    }

    pub async fn delete_conversation(&self, id: i64) -> Result<(), StorageError> {
        self.chats.delete_conversation(id).await
    }

    /// Messages of an existing conversation in creation order.
    pub async fn get_messages(&self, conversation_id: i64) -> Result<Vec<Message>, StorageError> {
        self.get_conversation(conversation_id).await?;
        self.chats.get_messages(conversation_id).await
    }

    /// Audio fragments of an existing message in sequence order.
    pub async fn get_fragments(&self, message_id: i64) -> Result<Vec<AudioFragment>, StorageError> {
        if self.chats.get_message(message_id).await?.is_none() {
            return Err(StorageError::MessageNotFound(message_id));
        }
        self.fragments.list_fragments(message_id).await
    }
}
