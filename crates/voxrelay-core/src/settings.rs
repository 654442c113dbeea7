//! Relay settings and validation.
//!
//! Pure configuration values for the streaming pipeline. Adapters build a
//! [`RelaySettings`] from CLI flags or environment and hand it to the core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::text::ChunkPolicy;

/// Voice used when a client has not picked one.
pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";

/// Content stored for an assistant message whose turn was cancelled.
pub const CANCELLED_PLACEHOLDER: &str = "[Response cancelled by user]";

/// Tunables for the streaming relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelaySettings {
    /// Force a chunk cut past this many characters.
    pub max_chunk_chars: usize,

    /// Minimum visible characters after a clause delimiter before cutting.
    pub min_clause_chars: usize,

    /// Delay after each emitted fragment, in milliseconds.
    pub pacing_delay_ms: u64,

    pub default_voice: String,

    pub cancelled_placeholder: String,

    /// Conversation titles derived from the first message are cut here.
    pub title_max_chars: usize,

    /// How long a new turn waits for the cancelled previous one to wind
    /// down before starting anyway, in milliseconds.
    pub drain_timeout_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RelaySettings {
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            max_chunk_chars: 100,
            min_clause_chars: 10,
            pacing_delay_ms: 50,
            default_voice: DEFAULT_VOICE.to_string(),
            cancelled_placeholder: CANCELLED_PLACEHOLDER.to_string(),
            title_max_chars: 50,
            drain_timeout_ms: 5_000,
        }
    }

    pub const fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy {
            max_chunk_chars: self.max_chunk_chars,
            min_clause_chars: self.min_clause_chars,
        }
    }

    pub const fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub const fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Title for a conversation opened by `content`.
    ///
    /// Content longer than `title_max_chars` is cut and suffixed with `...`.
    pub fn conversation_title(&self, content: &str) -> String {
        let content = content.trim();
        if content.chars().count() > self.title_max_chars {
            let head: String = content.chars().take(self.title_max_chars).collect();
            format!("{head}...")
        } else {
            content.to_string()
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Max chunk length must be at least 1 character")]
    InvalidMaxChunk,

    #[error("Clause threshold {clause} must be below the max chunk length {max}")]
    InvalidClauseThreshold { clause: usize, max: usize },

    #[error("Default voice cannot be empty")]
    EmptyVoice,

    #[error("Cancellation placeholder cannot be empty")]
    EmptyPlaceholder,

    #[error("Title length must be at least 1 character")]
    InvalidTitleLength,
}

/// Validate settings values.
pub fn validate_settings(settings: &RelaySettings) -> Result<(), SettingsError> {
    if settings.max_chunk_chars == 0 {
        return Err(SettingsError::InvalidMaxChunk);
    }

    if settings.min_clause_chars >= settings.max_chunk_chars {
        return Err(SettingsError::InvalidClauseThreshold {
            clause: settings.min_clause_chars,
            max: settings.max_chunk_chars,
        });
    }

    if settings.default_voice.trim().is_empty() {
        return Err(SettingsError::EmptyVoice);
    }

    if settings.cancelled_placeholder.trim().is_empty() {
        return Err(SettingsError::EmptyPlaceholder);
    }

    if settings.title_max_chars == 0 {
        return Err(SettingsError::InvalidTitleLength);
    }

    Ok(())
}
