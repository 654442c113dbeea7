//! `InferencePort` implementation backed by an Ollama server.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, future, stream};
use reqwest::Client;
use tracing::{debug, warn};

use voxrelay_core::{InferenceError, InferenceEvent, InferencePort, InferenceStream, PromptMessage};

use crate::config::OllamaConfig;
use crate::models::ChatRequest;
use crate::stream::ndjson_events;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Streaming chat client for Ollama.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl InferencePort for OllamaClient {
    fn stream_chat(&self, history: Vec<PromptMessage>) -> InferenceStream {
        let request = self
            .http
            .post(self.config.chat_url())
            .json(&ChatRequest::streaming(&self.config, history));
        let request_timeout = self.config.request_timeout;
        let idle_timeout = self.config.idle_timeout;
        let model = self.config.model.clone();

        let opened = async move {
            debug!(%model, "Opening inference stream");
            let response = match tokio::time::timeout(request_timeout, request.send()).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return failure(classify(&e)),
                Err(_) => return failure(InferenceError::Timeout),
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), %body, "Inference request rejected");
                return failure(InferenceError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            ndjson_events(response.bytes_stream().boxed(), idle_timeout).boxed()
        };

        stream::once(opened).flatten().boxed()
    }

    async fn health_check(&self) -> bool {
        match self
            .http
            .get(self.config.tags_url())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Inference health check failed");
                false
            }
        }
    }
}

fn failure(error: InferenceError) -> InferenceStream {
    stream::once(future::ready(InferenceEvent::Error(error))).boxed()
}

fn classify(error: &reqwest::Error) -> InferenceError {
    if error.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Unavailable(error.to_string())
    }
}
