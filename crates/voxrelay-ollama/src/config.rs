//! Ollama connection and sampling configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "mistral";

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:11434`.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Upper bound on generated tokens per turn.
    pub num_predict: u32,
    /// Limit for connecting and receiving response headers.
    pub request_timeout: Duration,
    /// Limit on the gap between two body chunks of a streaming response.
    pub idle_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            top_p: 0.9,
            num_predict: 2048,
            request_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub(crate) fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    pub(crate) fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }
}
