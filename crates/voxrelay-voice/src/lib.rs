#![doc = include_str!("../README.md")]

mod catalog;
mod config;
mod http_backend;

pub use catalog::neural_voices;
pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, SpeechConfig};
pub use http_backend::HttpSpeechBackend;
