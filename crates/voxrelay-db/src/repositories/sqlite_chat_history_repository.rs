//! `SQLite` implementation of the `ChatHistoryRepository` trait.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use voxrelay_core::{
    domain::chat::{Conversation, Message, NewConversation, NewMessage},
    ports::{ChatHistoryRepository, StorageError, validate_role},
};

use super::db_error;

/// `SQLite` implementation of the `ChatHistoryRepository` trait.
pub struct SqliteChatHistoryRepository {
    pool: SqlitePool,
}

impl SqliteChatHistoryRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_conversation(row: &SqliteRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_message(row: &SqliteRow) -> Result<Message, StorageError> {
    let role: String = row.get("role");
    Ok(Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        role: validate_role(&role)?,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ChatHistoryRepository for SqliteChatHistoryRepository {
    async fn create_conversation(&self, conv: NewConversation) -> Result<i64, StorageError> {
        let result = sqlx::query("INSERT INTO chat_conversations (title) VALUES (?)")
            .bind(&conv.title)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, title, created_at, updated_at
             FROM chat_conversations
             ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.iter().map(row_to_conversation).collect())
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StorageError> {
        let row = sqlx::query(
            "SELECT id, title, created_at, updated_at
             FROM chat_conversations
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.as_ref().map(row_to_conversation))
    }

    async fn delete_conversation(&self, id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM chat_conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::ConversationNotFound(id));
        }
        Ok(())
    }

    async fn touch_conversation(&self, id: i64) -> Result<(), StorageError> {
        let result =
            sqlx::query("UPDATE chat_conversations SET updated_at = datetime('now') WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::ConversationNotFound(id));
        }
        Ok(())
    }

    async fn get_messages(&self, conversation_id: i64) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, created_at
             FROM chat_messages
             WHERE conversation_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_message).collect()
    }

    async fn get_message(&self, id: i64) -> Result<Option<Message>, StorageError> {
        let row = sqlx::query(
            "SELECT id, conversation_id, role, content, created_at
             FROM chat_messages
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_message).transpose()
    }

    async fn save_message(&self, msg: NewMessage) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO chat_messages (conversation_id, role, content) VALUES (?, ?, ?)",
        )
        .bind(msg.conversation_id)
        .bind(msg.role.as_str())
        .bind(&msg.content)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StorageError::ConversationNotFound(msg.conversation_id)
            } else {
                db_error(e)
            }
        })?;

        let message_id = result.last_insert_rowid();

        sqlx::query("UPDATE chat_conversations SET updated_at = datetime('now') WHERE id = ?")
            .bind(msg.conversation_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(message_id)
    }

    async fn update_message(&self, id: i64, content: String) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE chat_messages SET content = ? WHERE id = ?")
            .bind(&content)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::MessageNotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_foreign_key_violation())
}
