//! Chat history repository port definition.
//!
//! This port defines the interface for persisting and retrieving
//! conversations and messages.

use async_trait::async_trait;

use super::StorageError;
use crate::domain::chat::{Conversation, Message, MessageRole, NewConversation, NewMessage};

/// Port for chat history persistence operations.
///
/// Every method is a single-record operation that either fully succeeds or
/// leaves the store unchanged.
#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    /// Create a new conversation and return its id.
    async fn create_conversation(&self, conv: NewConversation) -> Result<i64, StorageError>;

    /// List all conversations, most recently active first.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StorageError>;

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StorageError>;

    /// Delete a conversation together with its messages and audio fragments.
    async fn delete_conversation(&self, id: i64) -> Result<(), StorageError>;

    /// Bump the conversation's activity timestamp.
    async fn touch_conversation(&self, id: i64) -> Result<(), StorageError>;

    /// Get all messages for a conversation in creation order.
    async fn get_messages(&self, conversation_id: i64) -> Result<Vec<Message>, StorageError>;

    async fn get_message(&self, id: i64) -> Result<Option<Message>, StorageError>;

    /// Save a new message and bump the conversation timestamp.
    async fn save_message(&self, msg: NewMessage) -> Result<i64, StorageError>;

    /// Replace a message's content.
    async fn update_message(&self, id: i64, content: String) -> Result<(), StorageError>;

    /// Cheap round-trip used by health reporting.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Validate a message role string.
pub fn validate_role(role: &str) -> Result<MessageRole, StorageError> {
    MessageRole::parse(role).ok_or_else(|| StorageError::InvalidRole(role.to_string()))
}
