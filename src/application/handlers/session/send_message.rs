//! SendMessageHandler - Runs one student utterance through a session's engine.

use std::sync::Arc;

use thiserror::Error;

use crate::application::conversation::{EngineError, TurnReply};
use crate::application::session::{SessionStore, SessionStoreError};
use crate::domain::foundation::SessionId;
use crate::ports::TokenUsage;

/// Command to send one utterance.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub session_id: SessionId,
    pub utterance: String,
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct SendMessageResult {
    pub reply: TurnReply,
    /// Chat usage so far.
    pub usage: TokenUsage,
    pub asked_count: usize,
    pub remaining_count: usize,
}

#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// Handler for conversation turns.
pub struct SendMessageHandler {
    sessions: Arc<dyn SessionStore>,
}

impl SendMessageHandler {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn handle(
        &self,
        cmd: SendMessageCommand,
    ) -> Result<SendMessageResult, SendMessageError> {
        let utterance = cmd.utterance.trim();
        if utterance.is_empty() {
            return Err(SendMessageError::EmptyMessage);
        }

        let entry = self.sessions.get(cmd.session_id).await?;
        // Held for the whole turn: one in-flight turn per session.
        let mut engine = entry.engine.lock().await;
        self.sessions.touch(cmd.session_id).await?;
        let reply = engine.chat_turn(utterance).await?;
        // The session may have been ended while the turn ran; the reply stands.
        if let Err(err) = self.sessions.touch(cmd.session_id).await {
            tracing::debug!(
                session_id = %cmd.session_id,
                error = %err,
                "Session ended during turn"
            );
        }

        let tracker = engine.tracker();
        Ok(SendMessageResult {
            reply,
            usage: engine.token_usage(),
            asked_count: tracker.asked_count(),
            remaining_count: tracker.questions().len() - tracker.asked_count(),
        })
    }
}
