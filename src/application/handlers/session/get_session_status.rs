//! GetSessionStatusHandler - Query handler for a live session's progress.

use std::sync::Arc;

use crate::application::conversation::EngineState;
use crate::application::session::{SessionStore, SessionStoreError};
use crate::domain::foundation::{CaseId, SessionId, StudentId, Timestamp};
use crate::ports::TokenUsage;

/// Query for one session's status.
#[derive(Debug, Clone)]
pub struct GetSessionStatusQuery {
    pub session_id: SessionId,
}

/// Snapshot of a live session.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub case_id: CaseId,
    pub student_id: Option<StudentId>,
    pub state: EngineState,
    pub turn_count: u32,
    pub usage: TokenUsage,
    pub auxiliary_usage: TokenUsage,
    pub asked_count: usize,
    pub remaining_count: usize,
    pub started_at: Timestamp,
    pub last_activity: Timestamp,
}

/// Handler for session status queries.
pub struct GetSessionStatusHandler {
    sessions: Arc<dyn SessionStore>,
}

impl GetSessionStatusHandler {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn handle(
        &self,
        query: GetSessionStatusQuery,
    ) -> Result<SessionStatus, SessionStoreError> {
        let entry = self.sessions.get(query.session_id).await?;
        let engine = entry.engine.lock().await;
        let tracker = engine.tracker();

        Ok(SessionStatus {
            session_id: query.session_id,
            case_id: entry.metadata.case_id.clone(),
            student_id: entry.metadata.student_id.clone(),
            state: engine.state(),
            turn_count: engine.turn_count(),
            usage: engine.token_usage(),
            auxiliary_usage: engine.auxiliary_usage(),
            asked_count: tracker.asked_count(),
            remaining_count: tracker.questions().len() - tracker.asked_count(),
            started_at: entry.metadata.started_at,
            last_activity: entry.metadata.last_activity,
        })
    }
}
