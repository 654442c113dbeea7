#![doc = include_str!("../README.md")]

mod client;
mod config;
mod models;
mod stream;

pub use client::OllamaClient;
pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, OllamaConfig};
