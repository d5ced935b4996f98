//! StartSessionHandler - Command handler for starting exam sessions.

use std::sync::Arc;

use thiserror::Error;

use crate::application::conversation::{
    ConversationEngine, EngineConfig, EngineError, EngineProviders,
};
use crate::application::session::{SessionEntry, SessionMetadata, SessionStore, SessionStoreError};
use crate::domain::case::PersonaKind;
use crate::domain::foundation::{CaseId, SessionId, StudentId};
use crate::ports::{CaseLoadError, CaseRepository};

/// Command to start a session for one case.
#[derive(Debug, Clone)]
pub struct StartSessionCommand {
    pub case_id: CaseId,
    pub student_id: Option<StudentId>,
}

/// Result of a successful start.
#[derive(Debug, Clone)]
pub struct StartSessionResult {
    pub session_id: SessionId,
    pub case_id: CaseId,
    pub case_title: String,
    pub persona_kind: PersonaKind,
    pub fallback_question_count: usize,
}

#[derive(Debug, Error)]
pub enum StartSessionError {
    #[error(transparent)]
    CaseLoad(#[from] CaseLoadError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// Handler for starting sessions.
pub struct StartSessionHandler {
    cases: Arc<dyn CaseRepository>,
    sessions: Arc<dyn SessionStore>,
    providers: EngineProviders,
    config: EngineConfig,
}

impl StartSessionHandler {
    pub fn new(
        cases: Arc<dyn CaseRepository>,
        sessions: Arc<dyn SessionStore>,
        providers: EngineProviders,
        config: EngineConfig,
    ) -> Self {
        Self {
            cases,
            sessions,
            providers,
            config,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartSessionCommand,
    ) -> Result<StartSessionResult, StartSessionError> {
        // 1. Load case
        let case = self.cases.load(&cmd.case_id).await?;

        // 2. Build engine
        let session_id = SessionId::new();
        let result = StartSessionResult {
            session_id,
            case_id: case.case_id.clone(),
            case_title: case.title.clone(),
            persona_kind: case.persona_kind,
            fallback_question_count: case
                .fallback_questions
                .as_ref()
                .map_or(0, |block| block.questions.len()),
        };
        let engine =
            ConversationEngine::new(session_id, case, self.config.clone(), self.providers.clone())?;

        // 3. Register
        let metadata = SessionMetadata::new(session_id, cmd.case_id, cmd.student_id);
        self.sessions.insert(SessionEntry::new(metadata, engine)).await?;

        tracing::info!(
            session_id = %session_id,
            case_id = %result.case_id,
            "Session started"
        );

        Ok(result)
    }
}
