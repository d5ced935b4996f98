//! Application handlers.
//!
//! Command and query handlers that orchestrate sessions.

pub mod session;

pub use session::{
    EndSessionCommand, EndSessionHandler, EndSessionResult, GetSessionStatusHandler,
    GetSessionStatusQuery, SendMessageCommand, SendMessageError, SendMessageHandler,
    SendMessageResult, SessionStatus, StartSessionCommand, StartSessionError, StartSessionHandler,
    StartSessionResult,
};
