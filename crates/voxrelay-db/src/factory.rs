//! Composition utilities for wiring `SQLite` repositories.
//!
//! Construction only; no domain logic lives here.

use sqlx::SqlitePool;
use std::sync::Arc;

use voxrelay_core::Repos;

use crate::repositories::{SqliteAudioFragmentRepository, SqliteChatHistoryRepository};

/// Factory for creating repository instances with `SQLite` backends.
pub struct CoreFactory;

impl CoreFactory {
    /// Build all `SQLite` repositories from a pool.
    ///
    /// This is the recommended way for adapters to obtain repositories.
    pub fn build_repos(pool: SqlitePool) -> Repos {
        Repos::new(
            Self::chat_history_repository(pool.clone()),
            Self::audio_fragment_repository(pool),
        )
    }

    pub fn chat_history_repository(pool: SqlitePool) -> Arc<SqliteChatHistoryRepository> {
        Arc::new(SqliteChatHistoryRepository::new(pool))
    }

    pub fn audio_fragment_repository(pool: SqlitePool) -> Arc<SqliteAudioFragmentRepository> {
        Arc::new(SqliteAudioFragmentRepository::new(pool))
    }
}
