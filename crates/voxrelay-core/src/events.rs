//! Events pushed to a connected client.
//!
//! [`OutboundEvent`] is the server half of the wire protocol; it serializes
//! to a JSON object tagged by `type`. [`ClientConnection`] is the only way
//! core code reaches a client.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Serialize, Serializer};
use tokio::sync::mpsc;

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    StreamingStopped,
    NoActiveStream,
}

/// A message sent from the server to one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// One synthesized fragment of an assistant turn.
    ChatResponse {
        message_id: i64,
        conversation_id: i64,
        /// Cumulative assistant text at the time the fragment was cut.
        content: String,
        #[serde(serialize_with = "as_base64")]
        audio_data: Vec<u8>,
        chunk_index: u32,
        is_final: bool,
    },

    /// The turn completed and its full text is stored.
    ResponseComplete {
        message_id: i64,
        conversation_id: i64,
        content: String,
    },

    /// The turn was cancelled; no further fragments follow.
    Cancelled {
        message_id: i64,
        conversation_id: i64,
    },

    Error {
        content: String,
    },

    StopStreamingResponse {
        status: StopStatus,
    },

    VoiceSettingsUpdated {
        voice: String,
    },
}

impl OutboundEvent {
    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }

    /// Short name used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ChatResponse { .. } => "chat_response",
            Self::ResponseComplete { .. } => "response_complete",
            Self::Cancelled { .. } => "cancelled",
            Self::Error { .. } => "error",
            Self::StopStreamingResponse { .. } => "stop_streaming_response",
            Self::VoiceSettingsUpdated { .. } => "voice_settings_updated",
        }
    }
}

fn as_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

/// The receiving side went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("client connection closed")]
pub struct ConnectionClosed;

/// Handle used to push events to one client.
///
/// Cheap to clone; every clone feeds the same outbound queue, which the
/// transport adapter drains in order.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    tx: mpsc::Sender<OutboundEvent>,
}

impl ClientConnection {
    pub const fn new(tx: mpsc::Sender<OutboundEvent>) -> Self {
        Self { tx }
    }

    /// Create a connection and the receiver the transport drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Queue an event, waiting for room if the queue is full.
    pub async fn send(&self, event: OutboundEvent) -> Result<(), ConnectionClosed> {
        self.tx.send(event).await.map_err(|_| ConnectionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
