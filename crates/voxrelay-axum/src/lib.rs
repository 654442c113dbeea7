#![doc = include_str!("../README.md")]

pub mod bootstrap;
pub mod cli;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, bootstrap, start_server};
pub use cli::Cli;
pub use error::HttpError;
pub use routes::{create_router, create_spa_router};
pub use state::AppState;
