//! Voice chat WebSocket.
//!
//! `GET /ws/{client_id}` upgrades to a JSON text-frame socket. The client
//! identity is bound in the session registry for the socket's lifetime.
//!
//! Two tasks share the split socket:
//! * **Ingest** reads client commands and dispatches them to the relay.
//!   Direct replies (acks and errors) go through the client's outbound
//!   queue so they stay ordered with turn events.
//! * **Egress** drains the outbound queue and writes each event as a
//!   text frame.
//!
//! Whichever task ends first aborts the other, then the client is
//! unregistered, which cancels any running turn.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use voxrelay_core::{Connected, OutboundEvent, StartTurn};

use crate::state::AppState;

/// A message sent from the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Chat {
        content: String,
        #[serde(default)]
        conversation_id: Option<i64>,
        #[serde(default)]
        voice: Option<String>,
    },
    StopStreaming,
    VoiceSettings {
        voice: String,
    },
}

/// GET /ws/{client_id}
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state))
}

async fn handle_socket(mut socket: WebSocket, client_id: String, state: AppState) {
    let Connected {
        connection,
        mut outbound,
    } = match state.relay.connect(&client_id).await {
        Ok(connected) => connected,
        Err(e) => {
            warn!(%client_id, error = %e, "Rejecting WebSocket");
            if let Ok(frame) = serde_json::to_string(&OutboundEvent::error(e.to_string())) {
                let _ = socket.send(Message::Text(frame.into())).await;
            }
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let mut ingest = tokio::spawn({
        let state = state.clone();
        let client_id = client_id.clone();
        async move {
            while let Some(frame) = ws_receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let reply = match serde_json::from_str::<ClientCommand>(text.as_str()) {
                            Ok(command) => dispatch(&state, &client_id, command).await,
                            Err(e) => {
                                debug!(%client_id, error = %e, "Undecodable client message");
                                Some(OutboundEvent::error(format!("Invalid message: {e}")))
                            }
                        };
                        if let Some(event) = reply {
                            if connection.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Binary(_)) => {
                        warn!(%client_id, "Ignoring binary frame");
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
    });

    let mut egress = tokio::spawn({
        let client_id = client_id.clone();
        async move {
            while let Some(event) = outbound.recv().await {
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(%client_id, kind = event.kind(), error = %e, "Failed to encode event");
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut ingest => { egress.abort(); }
        _ = &mut egress => { ingest.abort(); }
    }

    state.relay.disconnect(&client_id).await;
    info!(%client_id, "WebSocket closed");
}

/// Run one command and return the direct reply, if any.
///
/// Turn progress is not a reply; the orchestrator reports it through the
/// outbound queue.
async fn dispatch(state: &AppState, client_id: &str, command: ClientCommand) -> Option<OutboundEvent> {
    match command {
        ClientCommand::Chat {
            content,
            conversation_id,
            voice,
        } => {
            let request = StartTurn {
                content,
                conversation_id,
                voice,
            };
            match state.relay.start_turn(client_id, request).await {
                Ok(_) => None,
                Err(e) => Some(OutboundEvent::error(e.to_string())),
            }
        }
        ClientCommand::StopStreaming => Some(OutboundEvent::StopStreamingResponse {
            status: state.relay.stop(client_id).await,
        }),
        ClientCommand::VoiceSettings { voice } => {
            match state.relay.set_voice(client_id, &voice).await {
                Ok(()) => Some(OutboundEvent::VoiceSettingsUpdated { voice }),
                Err(e) => Some(OutboundEvent::error(e.to_string())),
            }
        }
    }
}
