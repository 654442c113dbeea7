//! HTTP and WebSocket handlers.

pub mod chat;
pub mod health;
pub mod voices;
pub mod ws;
