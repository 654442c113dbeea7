//! Shared fixtures: in-memory storage, scripted inference and synthesis.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use mockall::mock;
use tokio::sync::mpsc;

use voxrelay_core::{
    InferenceEvent, InferencePort, InferenceStream, MessageRole, NewConversation, NewMessage,
    OutboundEvent, PromptMessage, RelaySettings, Repos, SpeechSynthesizer, StreamOrchestrator,
    SynthesisError, VoiceInfo,
};
use voxrelay_db::{CoreFactory, setup_test_database};

// ── Storage ────────────────────────────────────────────────────────

pub async fn test_repos() -> Repos {
    let pool = setup_test_database().await.unwrap();
    CoreFactory::build_repos(pool)
}

/// A conversation holding one user message and an empty assistant reply.
pub struct Seeded {
    pub repos: Repos,
    pub conversation_id: i64,
    pub message_id: i64,
}

pub async fn seeded(user_content: &str) -> Seeded {
    let repos = test_repos().await;
    let conversation_id = repos
        .chat_history
        .create_conversation(NewConversation {
            title: "Test".to_string(),
        })
        .await
        .unwrap();
    repos
        .chat_history
        .save_message(NewMessage {
            conversation_id,
            role: MessageRole::User,
            content: user_content.to_string(),
        })
        .await
        .unwrap();
    let message_id = repos
        .chat_history
        .save_message(NewMessage {
            conversation_id,
            role: MessageRole::Assistant,
            content: String::new(),
        })
        .await
        .unwrap();
    Seeded {
        repos,
        conversation_id,
        message_id,
    }
}

pub fn fast_settings() -> RelaySettings {
    RelaySettings {
        pacing_delay_ms: 0,
        drain_timeout_ms: 2_000,
        ..RelaySettings::with_defaults()
    }
}

pub fn orchestrator(
    repos: &Repos,
    inference: Arc<dyn InferencePort>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
) -> StreamOrchestrator {
    StreamOrchestrator::new(
        Arc::clone(&repos.chat_history),
        Arc::clone(&repos.audio_fragments),
        inference,
        synthesizer,
        fast_settings(),
    )
}

// ── Inference ──────────────────────────────────────────────────────

/// One scripted `stream_chat` call.
#[derive(Clone)]
pub struct Script {
    pub events: Vec<InferenceEvent>,
    /// Keep the stream open after the scripted events instead of ending.
    pub hang: bool,
}

impl Script {
    /// Deltas followed by a done marker.
    pub fn reply(deltas: &[&str]) -> Self {
        let mut events: Vec<InferenceEvent> =
            deltas.iter().map(|d| InferenceEvent::delta(*d)).collect();
        events.push(InferenceEvent::done(""));
        Self {
            events,
            hang: false,
        }
    }

    /// Deltas, then the stream stalls until dropped.
    pub fn stalled(deltas: &[&str]) -> Self {
        Self {
            events: deltas.iter().map(|d| InferenceEvent::delta(*d)).collect(),
            hang: true,
        }
    }

    pub fn events(events: Vec<InferenceEvent>) -> Self {
        Self {
            events,
            hang: false,
        }
    }
}

/// Plays one script per call; the last script repeats once the queue
/// runs dry. Records every history it receives.
pub struct ScriptedInference {
    scripts: Mutex<VecDeque<Script>>,
    last: Mutex<Option<Script>>,
    pub histories: Mutex<Vec<Vec<PromptMessage>>>,
}

impl ScriptedInference {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            last: Mutex::new(None),
            histories: Mutex::new(Vec::new()),
        })
    }

    pub fn history(&self, call: usize) -> Vec<PromptMessage> {
        self.histories.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl InferencePort for ScriptedInference {
    fn stream_chat(&self, history: Vec<PromptMessage>) -> InferenceStream {
        self.histories.lock().unwrap().push(history);
        let script = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.scripts.lock().unwrap().pop_front() {
                *last = Some(next);
            }
            last.clone().unwrap_or_else(|| Script::reply(&[]))
        };

        let events = stream::iter(script.events);
        if script.hang {
            events.chain(stream::pending()).boxed()
        } else {
            events.boxed()
        }
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// ── Synthesis ──────────────────────────────────────────────────────

/// Returns the sentence bytes as audio. Sentences listed in `fail` error
/// out; sentences listed in `block` never finish.
#[derive(Default)]
pub struct ScriptedSynthesizer {
    fail: HashSet<String>,
    block: HashSet<String>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn blocking_on(sentence: &str) -> Arc<Self> {
        Arc::new(Self {
            block: HashSet::from([sentence.to_string()]),
            ..Self::default()
        })
    }

    pub fn failing_on(sentence: &str) -> Arc<Self> {
        Arc::new(Self {
            fail: HashSet::from([sentence.to_string()]),
            ..Self::default()
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn voices_used(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, voice)| voice.clone())
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SynthesisError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), voice.to_string()));
        if self.block.contains(text) {
            std::future::pending::<()>().await;
        }
        if self.fail.contains(text) {
            return Err(SynthesisError::Engine {
                status: 500,
                message: "engine crashed".to_string(),
            });
        }
        Ok(text.as_bytes().to_vec())
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        ["en-US-JennyNeural", "en-GB-RyanNeural"]
            .into_iter()
            .map(|id| VoiceInfo {
                id: id.to_string(),
                name: id.to_string(),
                locale: id[..5].to_string(),
                gender: voxrelay_core::VoiceGender::Female,
            })
            .collect()
    }
}

mock! {
    pub Synthesizer {}

    #[async_trait]
    impl SpeechSynthesizer for Synthesizer {
        async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SynthesisError>;
        fn voices(&self) -> Vec<VoiceInfo>;
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Collect everything already queued or queued later, until every
/// sender is gone.
pub async fn drain(mut rx: mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Receive until `stop` matches, failing after a few seconds.
pub async fn recv_until(
    rx: &mut mpsc::Receiver<OutboundEvent>,
    stop: impl Fn(&OutboundEvent) -> bool,
) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed");
        let done = stop(&event);
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Poll `condition` every few milliseconds for up to five seconds.
pub async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

pub fn fragment_indices(events: &[OutboundEvent]) -> Vec<(u32, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            OutboundEvent::ChatResponse {
                chunk_index,
                is_final,
                ..
            } => Some((*chunk_index, *is_final)),
            _ => None,
        })
        .collect()
}
