//! Command-line interface for the `voxrelay` binary.
//!
//! Every flag falls back to an environment variable, so the server can be
//! configured entirely from `config.env` / `.env`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use voxrelay_core::{DEFAULT_VOICE, RelaySettings};
use voxrelay_ollama::OllamaConfig;
use voxrelay_voice::SpeechConfig;

use crate::bootstrap::{CorsConfig, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "voxrelay")]
#[command(about = "Stream Ollama replies as synthesized speech over WebSockets")]
#[command(version)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "VOXRELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "VOXRELAY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// SQLite database file (defaults to the per-user data directory)
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = voxrelay_ollama::DEFAULT_BASE_URL)]
    pub ollama_url: String,

    /// Ollama model name
    #[arg(long, env = "OLLAMA_MODEL", default_value = voxrelay_ollama::DEFAULT_MODEL)]
    pub ollama_model: String,

    /// Seconds to wait for Ollama to answer or send the next stream chunk
    #[arg(long, env = "OLLAMA_TIMEOUT", default_value_t = 30)]
    pub ollama_timeout: u64,

    /// Speech engine base URL (OpenAI-compatible `/v1/audio/speech`)
    #[arg(long, env = "TTS_URL", default_value = voxrelay_voice::DEFAULT_BASE_URL)]
    pub tts_url: String,

    /// Speech engine model name
    #[arg(long, env = "TTS_MODEL", default_value = voxrelay_voice::DEFAULT_MODEL)]
    pub tts_model: String,

    /// Voice for clients that have not picked one
    #[arg(long, env = "TTS_VOICE", default_value = DEFAULT_VOICE)]
    pub tts_voice: String,

    /// Force a text chunk cut past this many characters
    #[arg(long, env = "MAX_CHUNK_CHARS", default_value_t = 100)]
    pub max_chunk_chars: usize,

    /// Delay after each emitted fragment, in milliseconds
    #[arg(long, env = "PACING_DELAY_MS", default_value_t = 50)]
    pub pacing_delay_ms: u64,

    /// Serve a built frontend from this directory
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Comma-separated allowed origins (all origins when empty)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Also write daily-rotated logs to this directory
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        let timeout = Duration::from_secs(self.ollama_timeout);
        let mut ollama = OllamaConfig::new(&self.ollama_url, &self.ollama_model);
        ollama.request_timeout = timeout;
        ollama.idle_timeout = timeout;

        let settings = RelaySettings {
            max_chunk_chars: self.max_chunk_chars,
            pacing_delay_ms: self.pacing_delay_ms,
            default_voice: self.tts_voice.clone(),
            ..RelaySettings::with_defaults()
        };

        let origins: Vec<String> = self
            .cors_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        let cors = if origins.is_empty() {
            CorsConfig::AllowAll
        } else {
            CorsConfig::AllowOrigins(origins)
        };

        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            database_path: self.database_path.clone(),
            ollama,
            speech: SpeechConfig::new(&self.tts_url, &self.tts_model),
            settings,
            static_dir: self.static_dir.clone(),
            cors,
        }
    }
}
