//! Speech synthesis port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::VoiceInfo;

/// Errors from a single synthesis call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Nothing to synthesize")]
    EmptyText,

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Speech engine request failed: {0}")]
    Request(String),

    #[error("Speech engine returned HTTP {status}: {message}")]
    Engine { status: u16, message: String },

    #[error("Speech engine returned no audio")]
    EmptyAudio,
}

/// Converts one sentence of text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice` and return the encoded payload.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SynthesisError>;

    /// Voices this engine accepts.
    fn voices(&self) -> Vec<VoiceInfo>;

    fn supports_voice(&self, voice: &str) -> bool {
        self.voices().iter().any(|v| v.id == voice)
    }
}
