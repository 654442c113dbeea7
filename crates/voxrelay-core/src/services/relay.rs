//! Chat relay service - entry point for client control messages.
//!
//! Turns `start`, `stop` and `set_voice` requests from a transport adapter
//! into registry operations and orchestrated turns.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::audio::VoiceInfo;
use crate::domain::chat::{MessageRole, NewConversation, NewMessage};
use crate::events::{ClientConnection, OutboundEvent, StopStatus};
use crate::ports::{ChatHistoryRepository, InferencePort, Repos, SpeechSynthesizer, StorageError};
use crate::services::session_registry::{SessionError, SessionRegistry};
use crate::services::stream_orchestrator::{StreamOrchestrator, TurnRequest};
use crate::settings::RelaySettings;

/// Outbound queue depth per client.
const OUTBOUND_CAPACITY: usize = 64;

/// Errors surfaced to the client for a rejected control message.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message content cannot be empty")]
    EmptyContent,

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A registered client: the handle core code writes to and the queue the
/// transport drains.
#[derive(Debug)]
pub struct Connected {
    pub connection: ClientConnection,
    pub outbound: mpsc::Receiver<OutboundEvent>,
}

/// A client's request to start a turn.
#[derive(Debug, Clone, Default)]
pub struct StartTurn {
    pub content: String,
    /// Continue this conversation; a new one is created when absent.
    pub conversation_id: Option<i64>,
    /// Switch the client's voice before starting.
    pub voice: Option<String>,
}

/// Identifiers of a scheduled turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnStarted {
    pub conversation_id: i64,
    pub user_message_id: i64,
    pub message_id: i64,
    pub task_id: u64,
}

/// Reachability of the service's backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub inference: bool,
    pub storage: bool,
}

impl HealthReport {
    pub const fn is_healthy(self) -> bool {
        self.inference && self.storage
    }
}

pub struct ChatRelayService {
    chats: Arc<dyn ChatHistoryRepository>,
    inference: Arc<dyn InferencePort>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    orchestrator: Arc<StreamOrchestrator>,
    registry: Arc<SessionRegistry>,
    settings: RelaySettings,
}

impl ChatRelayService {
    pub fn new(
        repos: Repos,
        inference: Arc<dyn InferencePort>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        settings: RelaySettings,
    ) -> Self {
        let orchestrator = Arc::new(StreamOrchestrator::new(
            Arc::clone(&repos.chat_history),
            Arc::clone(&repos.audio_fragments),
            Arc::clone(&inference),
            Arc::clone(&synthesizer),
            settings.clone(),
        ));
        let registry = Arc::new(SessionRegistry::new(settings.drain_timeout()));

        Self {
            chats: repos.chat_history,
            inference,
            synthesizer,
            orchestrator,
            registry,
            settings,
        }
    }

    pub const fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub const fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Register a client and hand back both ends of its outbound queue.
    pub async fn connect(&self, client_id: &str) -> Result<Connected, SessionError> {
        let (connection, outbound) = ClientConnection::channel(OUTBOUND_CAPACITY);
        self.registry.register(client_id, connection.clone()).await?;
        info!(%client_id, "Client connected");
        Ok(Connected {
            connection,
            outbound,
        })
    }

    /// Tear down a client, cancelling any running turn.
    pub async fn disconnect(&self, client_id: &str) {
        if self.registry.unregister(client_id).await {
            info!(%client_id, "Client disconnected");
        }
    }

    /// Persist the user message and schedule the assistant turn.
    ///
    /// Any turn already running for the client is cancelled. Progress is
    /// reported through the client's connection, not the return value.
    pub async fn start_turn(
        &self,
        client_id: &str,
        request: StartTurn,
    ) -> Result<TurnStarted, RelayError> {
        if request.content.trim().is_empty() {
            return Err(RelayError::EmptyContent);
        }
        if let Some(voice) = request.voice.as_deref() {
            self.set_voice(client_id, voice).await?;
        }

        let connection = self
            .registry
            .connection(client_id)
            .await
            .ok_or_else(|| SessionError::NotConnected(client_id.to_string()))?;
        let voice = self
            .registry
            .voice(client_id)
            .await
            .unwrap_or_else(|| self.settings.default_voice.clone());

        let conversation_id = match request.conversation_id {
            Some(id) => {
                if self.chats.get_conversation(id).await?.is_none() {
                    return Err(StorageError::ConversationNotFound(id).into());
                }
                id
            }
            None => {
                let title = self.settings.conversation_title(&request.content);
                self.chats
                    .create_conversation(NewConversation { title })
                    .await?
            }
        };

        let user_message_id = self
            .chats
            .save_message(NewMessage {
                conversation_id,
                role: MessageRole::User,
                content: request.content,
            })
            .await?;
        let message_id = self
            .chats
            .save_message(NewMessage {
                conversation_id,
                role: MessageRole::Assistant,
                content: String::new(),
            })
            .await?;

        let orchestrator = Arc::clone(&self.orchestrator);
        let turn = TurnRequest {
            conversation_id,
            message_id,
            voice,
        };
        let task_id = self
            .registry
            .start_task(client_id, move |cancel| async move {
                orchestrator.run(turn, connection, cancel).await;
            })
            .await?;

        debug!(%client_id, conversation_id, message_id, task_id, "Turn scheduled");
        Ok(TurnStarted {
            conversation_id,
            user_message_id,
            message_id,
            task_id,
        })
    }

    /// Cancel the client's running turn, if any.
    pub async fn stop(&self, client_id: &str) -> StopStatus {
        if self.registry.cancel(client_id).await {
            info!(%client_id, "Streaming stopped by client");
            StopStatus::StreamingStopped
        } else {
            StopStatus::NoActiveStream
        }
    }

    /// Select the voice used for the client's future turns.
    pub async fn set_voice(&self, client_id: &str, voice: &str) -> Result<(), RelayError> {
        if !self.synthesizer.supports_voice(voice) {
            return Err(RelayError::UnknownVoice(voice.to_string()));
        }
        self.registry.set_voice(client_id, voice).await?;
        debug!(%client_id, %voice, "Voice updated");
        Ok(())
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.synthesizer.voices()
    }

    pub async fn health(&self) -> HealthReport {
        let (inference, storage) =
            tokio::join!(self.inference.health_check(), self.chats.ping());
        HealthReport {
            inference,
            storage: storage.is_ok(),
        }
    }
}
