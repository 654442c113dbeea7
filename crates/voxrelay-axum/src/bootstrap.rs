//! Server bootstrap - the composition root.
//!
//! This is the only place where concrete adapters are instantiated and
//! wired into the core services.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use voxrelay_core::{
    ChatHistoryService, ChatRelayService, InferencePort, RelaySettings, Repos, SpeechSynthesizer,
    database_path, validate_settings,
};
use voxrelay_db::{CoreFactory, setup_database};
use voxrelay_ollama::{OllamaClient, OllamaConfig};
use voxrelay_voice::{HttpSpeechBackend, SpeechConfig};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `SQLite` file; `None` resolves the per-user data directory.
    pub database_path: Option<PathBuf>,
    pub ollama: OllamaConfig,
    pub speech: SpeechConfig,
    pub settings: RelaySettings,
    /// Optional path to static assets for SPA serving.
    pub static_dir: Option<PathBuf>,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: None,
            ollama: OllamaConfig::default(),
            speech: SpeechConfig::default(),
            settings: RelaySettings::with_defaults(),
            static_dir: None,
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Set the static directory for SPA serving.
    #[must_use]
    pub fn with_static_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(path.into());
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

/// Services shared by every handler.
pub struct AxumContext {
    pub relay: Arc<ChatRelayService>,
    pub history: ChatHistoryService,
}

impl AxumContext {
    /// Assemble the context from already-built adapters.
    pub fn new(
        repos: Repos,
        inference: Arc<dyn InferencePort>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        settings: RelaySettings,
    ) -> Self {
        let history = ChatHistoryService::new(&repos);
        let relay = Arc::new(ChatRelayService::new(repos, inference, synthesizer, settings));
        Self { relay, history }
    }
}

/// Build every adapter and the core services.
pub async fn bootstrap(config: &ServerConfig) -> Result<AxumContext> {
    validate_settings(&config.settings).context("Invalid relay settings")?;

    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => database_path()?,
    };
    info!(
        database_path = %db_path.display(),
        ollama_url = %config.ollama.base_url,
        model = %config.ollama.model,
        tts_url = %config.speech.base_url,
        default_voice = %config.settings.default_voice,
        "Bootstrapping voxrelay"
    );

    let pool = setup_database(&db_path).await?;
    let repos = CoreFactory::build_repos(pool);

    let inference: Arc<dyn InferencePort> = Arc::new(
        OllamaClient::new(config.ollama.clone()).context("Failed to build Ollama client")?,
    );
    let synthesizer = HttpSpeechBackend::new(config.speech.clone())
        .context("Failed to build speech client")?;
    if !synthesizer.supports_voice(&config.settings.default_voice) {
        anyhow::bail!(
            "Default voice {} is not in the voice catalog",
            config.settings.default_voice
        );
    }

    Ok(AxumContext::new(
        repos,
        inference,
        Arc::new(synthesizer),
        config.settings.clone(),
    ))
}

/// Bootstrap and serve until the process is stopped.
///
/// If `config.static_dir` is set, serves static assets with SPA fallback.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let ctx = bootstrap(&config).await?;

    let app = if let Some(ref static_dir) = config.static_dir {
        info!("Serving static assets from: {}", static_dir.display());
        crate::routes::create_spa_router(ctx, static_dir, &config.cors)
    } else {
        crate::routes::create_router(ctx, &config.cors)
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("voxrelay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("voxrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
