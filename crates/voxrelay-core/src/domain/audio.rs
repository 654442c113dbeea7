//! Audio fragment and voice catalog types.

use serde::{Deserialize, Serialize};

/// One unit of synthesized speech belonging to an assistant message.
///
/// Fragments of a message carry contiguous `sequence_index` values starting
/// at 0. At most one fragment per message has `is_final` set, and it is the
/// one with the highest index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFragment {
    pub id: i64,
    pub message_id: i64,
    pub sequence_index: u32,
    /// Encoded audio exactly as returned by the speech engine.
    pub audio: Vec<u8>,
    pub is_final: bool,
    pub created_at: String,
}

/// Data for appending a fragment.
#[derive(Debug, Clone)]
pub struct NewAudioFragment {
    pub message_id: i64,
    pub sequence_index: u32,
    pub audio: Vec<u8>,
    pub is_final: bool,
}

/// A voice offered by the speech engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Identifier passed to the engine (e.g. `en-US-JennyNeural`).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// BCP 47 locale of the voice.
    pub locale: String,
    pub gender: VoiceGender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Female,
    Male,
}
