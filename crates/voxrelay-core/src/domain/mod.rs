//! Domain types for voxrelay.
//!
//! Pure data structures with no infrastructure dependencies. Persistence
//! and transport adapters map to and from these.

pub mod audio;
pub mod chat;

pub use audio::{AudioFragment, NewAudioFragment, VoiceGender, VoiceInfo};
pub use chat::{Conversation, Message, MessageRole, NewConversation, NewMessage, PromptMessage};
