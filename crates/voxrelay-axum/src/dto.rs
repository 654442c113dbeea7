//! Adapter-local request and response bodies.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use voxrelay_core::{AudioFragment, HealthReport, VoiceInfo};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub ollama_connected: bool,
    pub database_connected: bool,
}

impl From<HealthReport> for HealthResponse {
    fn from(report: HealthReport) -> Self {
        let status = if report.is_healthy() { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            ollama_connected: report.inference,
            database_connected: report.storage,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceInfo>,
    pub default_voice: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

/// A persisted fragment with its audio encoded for JSON.
#[derive(Debug, Serialize)]
pub struct AudioFragmentResponse {
    pub id: i64,
    pub message_id: i64,
    pub sequence_index: u32,
    pub audio_data: String,
    pub is_final: bool,
    pub created_at: String,
}

impl From<AudioFragment> for AudioFragmentResponse {
    fn from(fragment: AudioFragment) -> Self {
        Self {
            id: fragment.id,
            message_id: fragment.message_id,
            sequence_index: fragment.sequence_index,
            audio_data: STANDARD.encode(&fragment.audio),
            is_final: fragment.is_final,
            created_at: fragment.created_at,
        }
    }
}
