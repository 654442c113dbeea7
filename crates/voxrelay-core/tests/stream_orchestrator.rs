//! Orchestrator turns against in-memory storage.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use common::{
    MockSynthesizer, Script, ScriptedInference, ScriptedSynthesizer, drain, fast_settings,
    fragment_indices, orchestrator, seeded, wait_for,
};
use voxrelay_core::{
    AudioFragment, AudioFragmentRepository, CANCELLED_PLACEHOLDER, ClientConnection,
    InferenceError, InferenceEvent, MessageRole, NewAudioFragment, OutboundEvent, StorageError,
    StreamOrchestrator, SynthesisError, TurnRequest, TurnState,
};

/// Holds every `append_fragment` until `release` is notified.
struct GatedFragments {
    inner: Arc<dyn AudioFragmentRepository>,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl AudioFragmentRepository for GatedFragments {
    async fn append_fragment(&self, fragment: NewAudioFragment) -> Result<i64, StorageError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.append_fragment(fragment).await
    }

    async fn list_fragments(&self, message_id: i64) -> Result<Vec<AudioFragment>, StorageError> {
        self.inner.list_fragments(message_id).await
    }

    async fn seal_fragments(&self, message_id: i64) -> Result<bool, StorageError> {
        self.inner.seal_fragments(message_id).await
    }
}

fn request(seed: &common::Seeded) -> TurnRequest {
    TurnRequest {
        conversation_id: seed.conversation_id,
        message_id: seed.message_id,
        voice: "en-US-JennyNeural".to_string(),
    }
}

async fn stored_content(seed: &common::Seeded) -> String {
    seed.repos
        .chat_history
        .get_message(seed.message_id)
        .await
        .unwrap()
        .unwrap()
        .content
}

async fn stored_fragments(seed: &common::Seeded) -> Vec<(u32, bool, Vec<u8>)> {
    seed.repos
        .audio_fragments
        .list_fragments(seed.message_id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| (f.sequence_index, f.is_final, f.audio))
        .collect()
}

#[tokio::test]
async fn test_two_chunk_reply_yields_two_fragments() {
    let seed = seeded("How are you?").await;
    let inference = ScriptedInference::new(vec![Script::reply(&[
        "Hello, how are you today?",
        " I am fine.",
    ])]);
    let synth = ScriptedSynthesizer::new();
    let orch = orchestrator(&seed.repos, inference, synth.clone());

    let (connection, rx) = ClientConnection::channel(16);
    let outcome = orch
        .run(request(&seed), connection, CancellationToken::new())
        .await;
    let events = drain(rx).await;

    assert_eq!(outcome.state, TurnState::Completed);
    assert_eq!(outcome.fragments, 2);
    assert_eq!(
        synth.calls.lock().unwrap().iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>(),
        vec!["Hello, how are you today?", "I am fine."]
    );

    assert_eq!(
        events,
        vec![
            OutboundEvent::ChatResponse {
                message_id: seed.message_id,
                conversation_id: seed.conversation_id,
                content: "Hello, how are you today?".to_string(),
                audio_data: b"Hello, how are you today?".to_vec(),
                chunk_index: 0,
                is_final: false,
            },
            OutboundEvent::ChatResponse {
                message_id: seed.message_id,
                conversation_id: seed.conversation_id,
                content: "Hello, how are you today? I am fine.".to_string(),
                audio_data: b"I am fine.".to_vec(),
                chunk_index: 1,
                is_final: true,
            },
            OutboundEvent::ResponseComplete {
                message_id: seed.message_id,
                conversation_id: seed.conversation_id,
                content: "Hello, how are you today? I am fine.".to_string(),
            },
        ]
    );

    assert_eq!(stored_content(&seed).await, "Hello, how are you today? I am fine.");
    assert_eq!(
        stored_fragments(&seed).await,
        vec![
            (0, false, b"Hello, how are you today?".to_vec()),
            (1, true, b"I am fine.".to_vec()),
        ]
    );
}

#[tokio::test]
async fn test_indices_contiguous_with_single_final() {
    let seed = seeded("Count").await;
    let inference = ScriptedInference::new(vec![Script::reply(&[
        "One. Two",
        ". Three!",
        " Four and the rest without a stop",
    ])]);
    let orch = orchestrator(&seed.repos, inference, ScriptedSynthesizer::new());

    let (connection, rx) = ClientConnection::channel(16);
    let outcome = orch
        .run(request(&seed), connection, CancellationToken::new())
        .await;
    let events = drain(rx).await;

    // "One. Two. Three!" is released on the "!" and the tail on finish.
    assert_eq!(outcome.state, TurnState::Completed);
    assert_eq!(
        fragment_indices(&events),
        vec![(0, false), (1, false), (2, false), (3, true)]
    );
    let stored: Vec<(u32, bool)> = stored_fragments(&seed)
        .await
        .into_iter()
        .map(|(i, f, _)| (i, f))
        .collect();
    assert_eq!(stored, fragment_indices(&events));
}

#[tokio::test]
async fn test_history_excludes_own_empty_reply() {
    let seed = seeded("What is Rust?").await;
    let inference = ScriptedInference::new(vec![Script::reply(&["A language."])]);
    let orch = orchestrator(&seed.repos, inference.clone(), ScriptedSynthesizer::new());

    let (connection, _rx) = ClientConnection::channel(16);
    orch.run(request(&seed), connection, CancellationToken::new())
        .await;

    let history = inference.history(0);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "What is Rust?");
}

#[tokio::test]
async fn test_cancel_before_any_fragment() {
    let seed = seeded("Hi").await;
    let inference = ScriptedInference::new(vec![Script::reply(&["Hello there."])]);
    let synth = ScriptedSynthesizer::new();
    let orch = orchestrator(&seed.repos, inference, synth.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (connection, rx) = ClientConnection::channel(16);
    let outcome = orch.run(request(&seed), connection, cancel).await;
    let events = drain(rx).await;

    assert_eq!(outcome.state, TurnState::Cancelled);
    assert_eq!(outcome.fragments, 0);
    assert_eq!(synth.call_count(), 0);
    assert_eq!(
        events,
        vec![OutboundEvent::Cancelled {
            message_id: seed.message_id,
            conversation_id: seed.conversation_id,
        }]
    );
    assert_eq!(stored_content(&seed).await, CANCELLED_PLACEHOLDER);
    assert!(stored_fragments(&seed).await.is_empty());
}

#[tokio::test]
async fn test_stop_during_synthesis_drops_in_flight_audio() {
    let seed = seeded("Letters").await;
    let inference = ScriptedInference::new(vec![Script::reply(&["Alpha. Beta. Gamma."])]);
    let synth = ScriptedSynthesizer::blocking_on("Gamma.");
    let orch = Arc::new(orchestrator(&seed.repos, inference, synth.clone()));

    let cancel = CancellationToken::new();
    let (connection, rx) = ClientConnection::channel(16);
    let run = tokio::spawn({
        let orch = Arc::clone(&orch);
        let request = request(&seed);
        let cancel = cancel.clone();
        async move { orch.run(request, connection, cancel).await }
    });

    wait_for(|| synth.call_count() == 3).await;
    cancel.cancel();
    let outcome = run.await.unwrap();
    let events = drain(rx).await;

    // Alpha was committed when Beta succeeded; Beta was still held and
    // Gamma was in flight, so neither reaches storage or the client.
    assert_eq!(outcome.state, TurnState::Cancelled);
    assert_eq!(outcome.fragments, 1);
    assert_eq!(fragment_indices(&events), vec![(0, false)]);
    assert!(matches!(events.last(), Some(OutboundEvent::Cancelled { .. })));
    assert_eq!(stored_fragments(&seed).await, vec![(0, true, b"Alpha.".to_vec())]);
    assert_eq!(stored_content(&seed).await, CANCELLED_PLACEHOLDER);
}

#[tokio::test]
async fn test_storage_failure_fails_turn() {
    let seed = seeded("Hi").await;
    // Occupy index 0 so the first commit collides.
    seed.repos
        .audio_fragments
        .append_fragment(NewAudioFragment {
            message_id: seed.message_id,
            sequence_index: 0,
            audio: vec![1],
            is_final: false,
        })
        .await
        .unwrap();

    let inference = ScriptedInference::new(vec![Script::reply(&["First one. Second one."])]);
    let orch = orchestrator(&seed.repos, inference, ScriptedSynthesizer::new());

    let (connection, rx) = ClientConnection::channel(16);
    let outcome = orch
        .run(request(&seed), connection, CancellationToken::new())
        .await;
    let events = drain(rx).await;

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.fragments, 0);
    assert_eq!(events.len(), 1);
    match &events[0] {
        OutboundEvent::Error { content } => {
            assert!(content.starts_with("Failed to store audio fragment"), "{content}");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(stored_content(&seed).await, "First one. Second one.");
}

#[tokio::test]
async fn test_inference_error_keeps_partial_text() {
    let seed = seeded("Hi").await;
    let inference = ScriptedInference::new(vec![Script::events(vec![
        InferenceEvent::delta("Partial answer so far"),
        InferenceEvent::Error(InferenceError::Backend("model unloaded".to_string())),
    ])]);
    let orch = orchestrator(&seed.repos, inference, ScriptedSynthesizer::new());

    let (connection, rx) = ClientConnection::channel(16);
    let outcome = orch
        .run(request(&seed), connection, CancellationToken::new())
        .await;
    let events = drain(rx).await;

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(
        events,
        vec![OutboundEvent::error(
            "Inference failed: Inference backend error: model unloaded"
        )]
    );
    assert_eq!(stored_content(&seed).await, "Partial answer so far");
}

#[tokio::test]
async fn test_synthesis_failure_skips_sentence() {
    let seed = seeded("Hi").await;
    let inference = ScriptedInference::new(vec![Script::reply(&["Good. Bad. Fine."])]);

    let mut synth = MockSynthesizer::new();
    synth
        .expect_synthesize()
        .times(3)
        .returning(|text, _voice| {
            if text == "Bad." {
                Err(SynthesisError::EmptyAudio)
            } else {
                Ok(text.as_bytes().to_vec())
            }
        });
    let orch = orchestrator(&seed.repos, inference, Arc::new(synth));

    let (connection, rx) = ClientConnection::channel(16);
    let outcome = orch
        .run(request(&seed), connection, CancellationToken::new())
        .await;
    let events = drain(rx).await;

    assert_eq!(outcome.state, TurnState::Completed);
    assert_eq!(fragment_indices(&events), vec![(0, false), (1, true)]);
    assert_eq!(
        stored_fragments(&seed).await,
        vec![(0, false, b"Good.".to_vec()), (1, true, b"Fine.".to_vec())]
    );
    assert_eq!(stored_content(&seed).await, "Good. Bad. Fine.");
}

#[tokio::test]
async fn test_client_gone_counts_as_cancel() {
    let seed = seeded("Hi").await;
    let inference = ScriptedInference::new(vec![Script::reply(&["One. Two."])]);
    let orch = orchestrator(&seed.repos, inference, ScriptedSynthesizer::new());

    let (connection, rx) = ClientConnection::channel(16);
    drop(rx);
    let outcome = orch
        .run(request(&seed), connection, CancellationToken::new())
        .await;

    // The first fragment is stored before the send fails.
    assert_eq!(outcome.state, TurnState::Cancelled);
    assert_eq!(stored_fragments(&seed).await, vec![(0, true, b"One.".to_vec())]);
    assert_eq!(stored_content(&seed).await, CANCELLED_PLACEHOLDER);
}

#[tokio::test]
async fn test_inference_error_commits_held_fragment_as_final() {
    let seed = seeded("Hi").await;
    let inference = ScriptedInference::new(vec![Script::events(vec![
        InferenceEvent::delta("One. Two."),
        InferenceEvent::delta(" and then"),
        InferenceEvent::Error(InferenceError::Backend("model unloaded".to_string())),
    ])]);
    let synth = ScriptedSynthesizer::new();
    let orch = orchestrator(&seed.repos, inference, synth.clone());

    let (connection, rx) = ClientConnection::channel(16);
    let outcome = orch
        .run(request(&seed), connection, CancellationToken::new())
        .await;
    let events = drain(rx).await;

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.fragments, 2);
    assert_eq!(synth.call_count(), 2);
    assert_eq!(fragment_indices(&events), vec![(0, false), (1, true)]);
    assert!(matches!(events.last(), Some(OutboundEvent::Error { .. })));
    assert_eq!(
        stored_fragments(&seed).await,
        vec![(0, false, b"One.".to_vec()), (1, true, b"Two.".to_vec())]
    );
    assert_eq!(stored_content(&seed).await, "One. Two. and then");
}

#[tokio::test]
async fn test_stop_during_fragment_write_suppresses_emit() {
    let seed = seeded("Hi").await;
    let gated = Arc::new(GatedFragments {
        inner: Arc::clone(&seed.repos.audio_fragments),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let inference = ScriptedInference::new(vec![Script::reply(&["One. Two."])]);
    let orch = Arc::new(StreamOrchestrator::new(
        Arc::clone(&seed.repos.chat_history),
        gated.clone(),
        inference,
        ScriptedSynthesizer::new(),
        fast_settings(),
    ));

    let cancel = CancellationToken::new();
    let (connection, rx) = ClientConnection::channel(16);
    let run = tokio::spawn({
        let orch = Arc::clone(&orch);
        let request = request(&seed);
        let cancel = cancel.clone();
        async move { orch.run(request, connection, cancel).await }
    });

    gated.entered.notified().await;
    cancel.cancel();
    gated.release.notify_one();
    let outcome = run.await.unwrap();
    let events = drain(rx).await;

    // The write lands, but the fragment is sealed instead of sent.
    assert_eq!(outcome.state, TurnState::Cancelled);
    assert_eq!(outcome.fragments, 1);
    assert_eq!(
        events,
        vec![OutboundEvent::Cancelled {
            message_id: seed.message_id,
            conversation_id: seed.conversation_id,
        }]
    );
    assert_eq!(stored_fragments(&seed).await, vec![(0, true, b"One.".to_vec())]);
    assert_eq!(stored_content(&seed).await, CANCELLED_PLACEHOLDER);
}
