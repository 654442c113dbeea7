//! Repository implementations using `SQLite`.
//!
//! These implementations encapsulate all SQL queries and database access.
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod sqlite_audio_fragment_repository;
mod sqlite_chat_history_repository;

pub use sqlite_audio_fragment_repository::SqliteAudioFragmentRepository;
pub use sqlite_chat_history_repository::SqliteChatHistoryRepository;

use voxrelay_core::StorageError;

fn db_error(err: sqlx::Error) -> StorageError {
    StorageError::Database(err.to_string())
}
