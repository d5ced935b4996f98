//! Session command and query handlers.

mod end_session;
mod get_session_status;
mod send_message;
mod start_session;

pub use end_session::{EndSessionCommand, EndSessionHandler, EndSessionResult};
pub use get_session_status::{GetSessionStatusHandler, GetSessionStatusQuery, SessionStatus};
pub use send_message::{SendMessageCommand, SendMessageError, SendMessageHandler, SendMessageResult};
pub use start_session::{
    StartSessionCommand, StartSessionError, StartSessionHandler, StartSessionResult,
};
