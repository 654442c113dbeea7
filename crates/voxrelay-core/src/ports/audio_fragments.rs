//! Audio fragment repository port.

use async_trait::async_trait;

use super::StorageError;
use crate::domain::audio::{AudioFragment, NewAudioFragment};

/// Port for the per-message audio fragment log.
#[async_trait]
pub trait AudioFragmentRepository: Send + Sync {
    /// Append one fragment. Fails with [`StorageError::DuplicateFragment`]
    /// when the `(message_id, sequence_index)` pair is already stored.
    async fn append_fragment(&self, fragment: NewAudioFragment) -> Result<i64, StorageError>;

    /// All fragments of a message ordered by `sequence_index`.
    async fn list_fragments(&self, message_id: i64) -> Result<Vec<AudioFragment>, StorageError>;

    /// Flag the highest-indexed fragment of a message as final.
    ///
    /// Used when a turn stops early so the stored log still ends with
    /// exactly one final fragment. Returns `false` if the message has none.
    async fn seal_fragments(&self, message_id: i64) -> Result<bool, StorageError>;
}
