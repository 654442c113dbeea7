//! Route definitions and router construction.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/voices", get(handlers::voices::list))
        .route(
            "/conversations",
            get(handlers::chat::list_conversations).post(handlers::chat::create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(handlers::chat::get_conversation).delete(handlers::chat::delete_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::chat::get_messages),
        )
        .route("/messages/{id}/audio", get(handlers::chat::get_audio))
        .route("/ws/{client_id}", get(handlers::ws::chat_ws))
}

/// Create the router with API and WebSocket routes only.
///
/// Axum 0.8 uses brace syntax for path parameters: `{id}`.
pub fn create_router(ctx: AxumContext, cors_config: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);

    api_routes()
        .with_state(state)
        .layer(build_cors_layer(cors_config))
        .layer(TraceLayer::new_for_http())
}

/// Create a router that also serves a built frontend.
///
/// Unmatched paths fall back to the static directory, and missing files
/// fall back to `index.html`.
pub fn create_spa_router<P: AsRef<Path>>(
    ctx: AxumContext,
    static_dir: P,
    cors_config: &CorsConfig,
) -> Router {
    let static_path = static_dir.as_ref();
    let serve_dir =
        ServeDir::new(static_path).fallback(ServeFile::new(static_path.join("index.html")));

    create_router(ctx, cors_config).fallback_service(serve_dir)
}
