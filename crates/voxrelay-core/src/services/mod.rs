//! Core services - the application's business logic layer.
//!
//! Services orchestrate between ports and domain logic. They never know
//! about concrete implementations.

mod chat_history;
mod relay;
mod session_registry;
mod stream_orchestrator;

pub use chat_history::{ChatHistoryService, DEFAULT_CONVERSATION_TITLE};
pub use relay::{ChatRelayService, Connected, HealthReport, RelayError, StartTurn, TurnStarted};
pub use session_registry::{SessionError, SessionRegistry};
pub use stream_orchestrator::{StreamOrchestrator, TurnOutcome, TurnRequest, TurnState};
