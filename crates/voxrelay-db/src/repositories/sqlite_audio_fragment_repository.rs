//! `SQLite` implementation of the `AudioFragmentRepository` trait.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use voxrelay_core::{
    domain::audio::{AudioFragment, NewAudioFragment},
    ports::{AudioFragmentRepository, StorageError},
};

use super::db_error;

pub struct SqliteAudioFragmentRepository {
    pool: SqlitePool,
}

impl SqliteAudioFragmentRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_fragment(row: &SqliteRow) -> Result<AudioFragment, StorageError> {
    let index: i64 = row.get("sequence_index");
    let sequence_index = u32::try_from(index)
        .map_err(|_| StorageError::Database(format!("sequence index out of range: {index}")))?;

    Ok(AudioFragment {
        id: row.get("id"),
        message_id: row.get("message_id"),
        sequence_index,
        audio: row.get("audio_data"),
        is_final: row.get("is_final"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl AudioFragmentRepository for SqliteAudioFragmentRepository {
    async fn append_fragment(&self, fragment: NewAudioFragment) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO audio_fragments (message_id, sequence_index, audio_data, is_final)
             VALUES (?, ?, ?, ?)",
        )
        .bind(fragment.message_id)
        .bind(i64::from(fragment.sequence_index))
        .bind(&fragment.audio)
        .bind(fragment.is_final)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StorageError::DuplicateFragment {
                message_id: fragment.message_id,
                sequence_index: fragment.sequence_index,
            },
            Some(db) if db.is_foreign_key_violation() => {
                StorageError::MessageNotFound(fragment.message_id)
            }
            _ => db_error(e),
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn list_fragments(&self, message_id: i64) -> Result<Vec<AudioFragment>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, message_id, sequence_index, audio_data, is_final, created_at
             FROM audio_fragments
             WHERE message_id = ?
             ORDER BY sequence_index ASC",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_fragment).collect()
    }

    async fn seal_fragments(&self, message_id: i64) -> Result<bool, StorageError> {
        // One statement so the final flag never sits on two rows.
        let result = sqlx::query(
            "UPDATE audio_fragments
             SET is_final = (sequence_index = (
                 SELECT MAX(sequence_index) FROM audio_fragments WHERE message_id = ?
             ))
             WHERE message_id = ?",
        )
        .bind(message_id)
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
