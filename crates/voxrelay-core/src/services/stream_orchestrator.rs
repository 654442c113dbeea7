//! Streaming orchestration for one assistant turn.
//!
//! ## State machine
//!
//! ```text
//!  Running ──(upstream done)──► Finalizing ──► Completed
//!     │                              │
//!     ├──(cancel)───────────────────►├──► Cancelled
//!     └──(inference/storage error)──►└──► Failed
//! ```
//!
//! In `Running`, every model delta is appended to the turn transcript and
//! to a [`ChunkAccumulator`]. Each released chunk is split into sentences
//! which are synthesized one at a time, in order. A synthesized sentence
//! becomes a fragment that is persisted, then emitted, then followed by a
//! short pacing delay.
//!
//! The most recent fragment is held back until either another sentence
//! succeeds or the turn finalizes, so the fragment carrying `is_final` is
//! always the true last one. An upstream failure still commits the held
//! fragment as final; a failed fragment write drops it.
//!
//! Every suspension point races the cancellation token, and the token is
//! checked again right before each fragment commit and before the
//! completed content is written. A cancelled turn never persists or emits
//! a fragment whose synthesis was still in flight.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::audio::NewAudioFragment;
use crate::domain::chat::PromptMessage;
use crate::events::{ClientConnection, OutboundEvent};
use crate::ports::{
    AudioFragmentRepository, ChatHistoryRepository, InferenceEvent, InferencePort,
    SpeechSynthesizer,
};
use crate::settings::RelaySettings;
use crate::text::{ChunkAccumulator, split_sentences};

/// Lifecycle states of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Running,
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

/// What a turn needs to run. The assistant message must already exist.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: i64,
    pub message_id: i64,
    pub voice: String,
}

/// Terminal state of a turn plus the number of fragments it committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub fragments: u32,
}

/// Why a running turn stopped early.
enum Halt {
    Cancelled,
    /// Upstream failed; the held fragment is still committed.
    Failed(String),
    /// A fragment write failed; nothing more is committed.
    Storage(String),
}

/// A synthesized sentence not yet committed.
struct HeldFragment {
    /// Transcript at the moment the sentence was synthesized.
    content: String,
    audio: Vec<u8>,
}

/// Drives assistant turns from model stream to client.
pub struct StreamOrchestrator {
    chats: Arc<dyn ChatHistoryRepository>,
    fragments: Arc<dyn AudioFragmentRepository>,
    inference: Arc<dyn InferencePort>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    settings: RelaySettings,
}

impl StreamOrchestrator {
    pub fn new(
        chats: Arc<dyn ChatHistoryRepository>,
        fragments: Arc<dyn AudioFragmentRepository>,
        inference: Arc<dyn InferencePort>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            chats,
            fragments,
            inference,
            synthesizer,
            settings,
        }
    }

    /// Run one turn to a terminal state.
    ///
    /// Never returns an error: failures are reported to the client as an
    /// error event and reflected in the returned [`TurnOutcome`].
    pub async fn run(
        &self,
        request: TurnRequest,
        connection: ClientConnection,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        let mut turn = Turn {
            orchestrator: self,
            request: &request,
            connection: &connection,
            cancel: &cancel,
            transcript: String::new(),
            committed: 0,
            held: None,
        };

        debug!(
            message_id = request.message_id,
            conversation_id = request.conversation_id,
            voice = %request.voice,
            state = ?TurnState::Running,
            "Turn started"
        );

        let outcome = match turn.drive().await {
            Ok(()) => turn.complete().await,
            Err(Halt::Cancelled) => turn.cancelled().await,
            Err(Halt::Failed(reason)) => turn.failed(reason, true).await,
            Err(Halt::Storage(reason)) => turn.failed(reason, false).await,
        };

        info!(
            message_id = request.message_id,
            state = ?outcome.state,
            fragments = outcome.fragments,
            "Turn finished"
        );
        outcome
    }
}

/// Per-run state. Owned by exactly one task and never shared.
struct Turn<'a> {
    orchestrator: &'a StreamOrchestrator,
    request: &'a TurnRequest,
    connection: &'a ClientConnection,
    cancel: &'a CancellationToken,
    transcript: String,
    committed: u32,
    held: Option<HeldFragment>,
}

impl Turn<'_> {
    /// `Running` and `Finalizing`. Returns `Ok` once every fragment,
    /// including the final one, is committed.
    async fn drive(&mut self) -> Result<(), Halt> {
        self.ensure_live()?;
        let history = self.load_history().await?;

        let mut stream = self.orchestrator.inference.stream_chat(history);
        let mut chunker = ChunkAccumulator::new(self.orchestrator.settings.chunk_policy());

        loop {
            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Halt::Cancelled),
                event = stream.next() => event,
            };

            match event {
                Some(InferenceEvent::Delta { text, done }) => {
                    self.transcript.push_str(&text);
                    if let Some(chunk) = chunker.push(&text) {
                        self.speak(&chunk).await?;
                    }
                    if done {
                        break;
                    }
                }
                Some(InferenceEvent::Error(err)) => {
                    return Err(Halt::Failed(format!("Inference failed: {err}")));
                }
                None => {
                    debug!(
                        message_id = self.request.message_id,
                        "Inference stream ended without a done marker"
                    );
                    break;
                }
            }
        }
        drop(stream);

        debug!(message_id = self.request.message_id, state = ?TurnState::Finalizing, "Upstream done");
        if let Some(rest) = chunker.finish() {
            self.speak(&rest).await?;
        }

        match self.held.take() {
            Some(last) => self.commit(last, true).await,
            None => Ok(()),
        }
    }

    async fn load_history(&self) -> Result<Vec<PromptMessage>, Halt> {
        let messages = self
            .orchestrator
            .chats
            .get_messages(self.request.conversation_id)
            .await
            .map_err(|e| Halt::Failed(format!("Failed to load conversation history: {e}")))?;

        Ok(messages
            .into_iter()
            .filter(|m| m.id != self.request.message_id && !m.content.trim().is_empty())
            .map(PromptMessage::from)
            .collect())
    }

    /// Synthesize each sentence of `chunk` in order.
    async fn speak(&mut self, chunk: &str) -> Result<(), Halt> {
        for sentence in split_sentences(chunk) {
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Halt::Cancelled),
                result = self
                    .orchestrator
                    .synthesizer
                    .synthesize(&sentence, &self.request.voice) => result,
            };

            match result {
                Ok(audio) => {
                    let fresh = HeldFragment {
                        content: self.transcript.clone(),
                        audio,
                    };
                    if let Some(previous) = self.held.replace(fresh) {
                        self.commit(previous, false).await?;
                    }
                }
                Err(err) => {
                    warn!(
                        message_id = self.request.message_id,
                        error = %err,
                        sentence = %sentence,
                        "Synthesis failed, skipping sentence"
                    );
                }
            }
        }
        Ok(())
    }

    /// Persist, emit, then pace one fragment.
    async fn commit(&mut self, fragment: HeldFragment, is_final: bool) -> Result<(), Halt> {
        self.ensure_live()?;

        let sequence_index = self.committed;
        self.orchestrator
            .fragments
            .append_fragment(NewAudioFragment {
                message_id: self.request.message_id,
                sequence_index,
                audio: fragment.audio.clone(),
                is_final,
            })
            .await
            .map_err(|e| Halt::Storage(format!("Failed to store audio fragment: {e}")))?;
        self.committed += 1;
        // A stop during the write still suppresses the emit.
        self.ensure_live()?;

        let event = OutboundEvent::ChatResponse {
            message_id: self.request.message_id,
            conversation_id: self.request.conversation_id,
            content: fragment.content,
            audio_data: fragment.audio,
            chunk_index: sequence_index,
            is_final,
        };
        if self.connection.send(event).await.is_err() {
            debug!(
                message_id = self.request.message_id,
                "Client went away mid-turn"
            );
            return Err(Halt::Cancelled);
        }
        debug!(
            message_id = self.request.message_id,
            sequence_index, is_final, "Fragment committed"
        );

        if !is_final {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Halt::Cancelled),
                () = tokio::time::sleep(self.orchestrator.settings.pacing_delay()) => {}
            }
        }
        Ok(())
    }

    async fn complete(&mut self) -> TurnOutcome {
        // A cancel that lands before the content is written still wins.
        if self.cancel.is_cancelled() {
            return self.cancelled().await;
        }

        let chats = &self.orchestrator.chats;
        if let Err(e) = chats
            .update_message(self.request.message_id, self.transcript.clone())
            .await
        {
            return self
                .failed(format!("Failed to store assistant response: {e}"), false)
                .await;
        }
        if let Err(e) = chats.touch_conversation(self.request.conversation_id).await {
            warn!(conversation_id = self.request.conversation_id, error = %e, "Failed to touch conversation");
        }

        let _ = self
            .connection
            .send(OutboundEvent::ResponseComplete {
                message_id: self.request.message_id,
                conversation_id: self.request.conversation_id,
                content: self.transcript.clone(),
            })
            .await;

        self.outcome(TurnState::Completed)
    }

    async fn cancelled(&mut self) -> TurnOutcome {
        self.held = None;

        let placeholder = self.orchestrator.settings.cancelled_placeholder.clone();
        if let Err(e) = self
            .orchestrator
            .chats
            .update_message(self.request.message_id, placeholder)
            .await
        {
            error!(message_id = self.request.message_id, error = %e, "Failed to store cancellation placeholder");
        }
        self.seal_fragments().await;

        let _ = self
            .connection
            .send(OutboundEvent::Cancelled {
                message_id: self.request.message_id,
                conversation_id: self.request.conversation_id,
            })
            .await;

        self.outcome(TurnState::Cancelled)
    }

    async fn failed(&mut self, reason: String, flush_held: bool) -> TurnOutcome {
        error!(message_id = self.request.message_id, %reason, "Turn failed");

        if let Some(last) = self.held.take().filter(|_| flush_held) {
            match self.commit(last, true).await {
                Ok(()) => {}
                Err(Halt::Cancelled) => {
                    debug!(message_id = self.request.message_id, "Final fragment dropped after stop");
                }
                Err(Halt::Failed(e) | Halt::Storage(e)) => {
                    warn!(message_id = self.request.message_id, error = %e, "Final fragment not committed");
                }
            }
        }

        if let Err(e) = self
            .orchestrator
            .chats
            .update_message(self.request.message_id, self.transcript.clone())
            .await
        {
            error!(message_id = self.request.message_id, error = %e, "Failed to store partial response");
        }
        self.seal_fragments().await;

        let _ = self.connection.send(OutboundEvent::error(reason)).await;

        self.outcome(TurnState::Failed)
    }

    /// Mark the last stored fragment final after an early stop.
    async fn seal_fragments(&self) {
        if self.committed == 0 {
            return;
        }
        if let Err(e) = self
            .orchestrator
            .fragments
            .seal_fragments(self.request.message_id)
            .await
        {
            warn!(message_id = self.request.message_id, error = %e, "Failed to seal fragments");
        }
    }

    fn ensure_live(&self) -> Result<(), Halt> {
        if self.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    const fn outcome(&self, state: TurnState) -> TurnOutcome {
        TurnOutcome {
            state,
            fragments: self.committed,
        }
    }
}
