//! `SpeechSynthesizer` over an OpenAI-compatible speech endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use voxrelay_core::{SpeechSynthesizer, SynthesisError, VoiceInfo};

use crate::catalog::neural_voices;
use crate::config::SpeechConfig;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Posts one sentence per request and returns the encoded body as-is.
#[derive(Clone)]
pub struct HttpSpeechBackend {
    http: Client,
    config: SpeechConfig,
    voices: Vec<VoiceInfo>,
}

impl HttpSpeechBackend {
    /// Create a backend offering the default neural voice catalog.
    pub fn new(config: SpeechConfig) -> Result<Self, reqwest::Error> {
        Self::with_voices(config, neural_voices())
    }

    pub fn with_voices(config: SpeechConfig, voices: Vec<VoiceInfo>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            config,
            voices,
        })
    }

    pub const fn config(&self) -> &SpeechConfig {
        &self.config
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechBackend {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SynthesisError> {
        let input = text.trim();
        if input.is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        if !self.supports_voice(voice) {
            return Err(SynthesisError::UnknownVoice(voice.to_string()));
        }

        let request = SpeechRequest {
            model: &self.config.model,
            input,
            voice,
            response_format: &self.config.response_format,
        };

        debug!(voice, chars = input.chars().count(), "Synthesizing sentence");
        let response = self
            .http
            .post(self.config.speech_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %message, "Speech engine rejected request");
            return Err(SynthesisError::Engine {
                status: status.as_u16(),
                message,
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        Ok(audio.to_vec())
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }
}
