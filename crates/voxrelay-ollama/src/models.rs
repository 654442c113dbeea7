//! Ollama `/api/chat` wire types.

use serde::{Deserialize, Serialize};

use voxrelay_core::PromptMessage;

use crate::config::OllamaConfig;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

impl ChatRequest {
    pub fn streaming(config: &OllamaConfig, history: Vec<PromptMessage>) -> Self {
        Self {
            model: config.model.clone(),
            messages: history.into_iter().map(WireMessage::from).collect(),
            stream: true,
            options: ChatOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_predict: config.num_predict,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<PromptMessage> for WireMessage {
    fn from(message: PromptMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

/// One NDJSON line of a streaming chat response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatStreamLine {
    #[serde(default)]
    pub message: Option<StreamMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamMessage {
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_sampling_options() {
        let config = OllamaConfig::default();
        let request = ChatRequest::streaming(&config, vec![PromptMessage::user("hi")]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "mistral",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true,
                "options": {"temperature": 0.7_f32, "top_p": 0.9_f32, "num_predict": 2048},
            })
        );
    }
}
