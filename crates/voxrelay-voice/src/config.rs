//! Speech endpoint configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5050";
pub const DEFAULT_MODEL: &str = "tts-1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:5050`.
    pub base_url: String,
    pub model: String,
    /// Container requested from the engine. Forwarded verbatim.
    pub response_format: String,
    /// Limit on a whole synthesis request, body included.
    pub request_timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            response_format: "mp3".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SpeechConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub(crate) fn speech_url(&self) -> String {
        format!("{}/v1/audio/speech", self.base_url)
    }
}
