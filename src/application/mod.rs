//! Application layer - Services, Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! `conversation` holds the per-session engine and its provider-backed
//! services; `session` holds the live-session registry; `handlers` expose
//! the session lifecycle as commands and queries.

pub mod conversation;
pub mod handlers;
pub mod session;

pub use conversation::{
    ConversationEngine, EngineConfig, EngineError, EngineProviders, EngineState, TurnReply,
};
pub use handlers::{
    EndSessionCommand, EndSessionHandler, EndSessionResult, GetSessionStatusHandler,
    GetSessionStatusQuery, SendMessageCommand, SendMessageError, SendMessageHandler,
    SendMessageResult, SessionStatus, StartSessionCommand, StartSessionError, StartSessionHandler,
    StartSessionResult,
};
pub use session::{
    SessionEntry, SessionMetadata, SessionReaper, SessionReaperConfig, SessionStore,
    SessionStoreError,
};
