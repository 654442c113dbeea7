#![doc = include_str!("../README.md")]

pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;
pub mod services;
pub mod settings;
pub mod text;

// Re-export commonly used types for convenience
pub use domain::{
    AudioFragment, Conversation, Message, MessageRole, NewAudioFragment, NewConversation,
    NewMessage, PromptMessage, VoiceGender, VoiceInfo,
};
pub use events::{ClientConnection, ConnectionClosed, OutboundEvent, StopStatus};
pub use paths::{PathError, data_root, database_path};
pub use ports::{
    AudioFragmentRepository, ChatHistoryRepository, InferenceError, InferenceEvent,
    InferencePort, InferenceStream, Repos, SpeechSynthesizer, StorageError, SynthesisError,
};
pub use services::{
    ChatHistoryService, ChatRelayService, Connected, HealthReport, RelayError, SessionError,
    SessionRegistry, StartTurn, StreamOrchestrator, TurnOutcome, TurnRequest, TurnStarted,
    TurnState,
};
pub use settings::{
    CANCELLED_PLACEHOLDER, DEFAULT_VOICE, RelaySettings, SettingsError, validate_settings,
};
pub use text::{ChunkAccumulator, ChunkPolicy, split_sentences};

