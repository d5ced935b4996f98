//! EndSessionHandler - Closes a session and reports its final record.

use std::sync::Arc;

use crate::application::session::{SessionStore, SessionStoreError};
use crate::domain::conversation::Turn;
use crate::domain::foundation::{CaseId, SessionId, Timestamp};
use crate::ports::TokenUsage;

/// Command to end a session.
#[derive(Debug, Clone)]
pub struct EndSessionCommand {
    pub session_id: SessionId,
}

/// Final record of an ended session.
#[derive(Debug, Clone)]
pub struct EndSessionResult {
    pub session_id: SessionId,
    pub case_id: CaseId,
    pub usage: TokenUsage,
    pub auxiliary_usage: TokenUsage,
    pub turn_count: u32,
    pub transcript: Vec<Turn>,
    /// Texts of the fallback questions the student reached.
    pub asked_questions: Vec<String>,
    pub duration_secs: i64,
}

/// Handler for ending sessions.
pub struct EndSessionHandler {
    sessions: Arc<dyn SessionStore>,
}

impl EndSessionHandler {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn handle(
        &self,
        cmd: EndSessionCommand,
    ) -> Result<EndSessionResult, SessionStoreError> {
        // 1. Unregister so no new turn can start
        let entry = self.sessions.remove(cmd.session_id).await?;

        // 2. Wait for any in-flight turn, then close
        let mut engine = entry.engine.lock().await;
        let usage = engine.close();

        let result = EndSessionResult {
            session_id: cmd.session_id,
            case_id: entry.metadata.case_id.clone(),
            usage,
            auxiliary_usage: engine.auxiliary_usage(),
            turn_count: engine.turn_count(),
            transcript: engine.transcript().to_vec(),
            asked_questions: engine
                .tracker()
                .questions()
                .iter()
                .filter(|question| question.is_asked())
                .map(|question| question.text().to_string())
                .collect(),
            duration_secs: Timestamp::now()
                .duration_since(&entry.metadata.started_at)
                .num_seconds(),
        };

        tracing::info!(
            session_id = %cmd.session_id,
            turns = result.turn_count,
            total_tokens = result.usage.total_tokens,
            "Session ended"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::session::InMemorySessionStore;
    use crate::application::conversation::{
        ConversationEngine, EngineConfig, EngineProviders, EngineState,
    };
    use crate::application::session::{SessionEntry, SessionMetadata};
    use crate::domain::case::{CaseProfile, PersonaKind, QuestionLimitType};
    use crate::domain::conversation::TurnRole;

    #[tokio::test]
    async fn closes_engine_and_returns_transcript() {
        let session_id = SessionId::new();
        let case_id = CaseId::new("fever-01").unwrap();
        let case = CaseProfile::new(case_id.clone(), PersonaKind::Guardian, "คุณสมศรี")
            .with_fallback_questions(QuestionLimitType::Single, ["ลูกจะเป็นอะไรมากมั๊ยคะ"]);
        let mock = MockAIProvider::new()
            .with_response_usage("[1]", TokenUsage::new(60, 3))
            .with_response_usage("ไม่เป็นไรมากค่ะ", TokenUsage::new(500, 12));
        let mut engine = ConversationEngine::new(
            session_id,
            case,
            EngineConfig::default(),
            EngineProviders::shared(Arc::new(mock)),
        )
        .unwrap();
        engine.chat_turn("ลูกจะเป็นอะไรมากไหม").await.unwrap();
        let entry = SessionEntry::new(SessionMetadata::new(session_id, case_id, None), engine);
        let engine_handle = entry.engine.clone();
        let store = Arc::new(InMemorySessionStore::new());
        store.insert(entry).await.unwrap();
        let handler = EndSessionHandler::new(store.clone());

        let result = handler.handle(EndSessionCommand { session_id }).await.unwrap();

        assert_eq!(result.usage, TokenUsage::new(500, 12));
        assert_eq!(result.auxiliary_usage, TokenUsage::new(60, 3));
        assert_eq!(result.turn_count, 1);
        assert_eq!(result.transcript.len(), 2);
        assert_eq!(result.transcript[1].role, TurnRole::Assistant);
        assert_eq!(result.asked_questions, vec!["ลูกจะเป็นอะไรมากมั๊ยคะ".to_string()]);
        assert_eq!(engine_handle.lock().await.state(), EngineState::Ended);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn ending_twice_reports_not_found() {
        let handler = EndSessionHandler::new(Arc::new(InMemorySessionStore::new()));

        let result = handler
            .handle(EndSessionCommand {
                session_id: SessionId::new(),
            })
            .await;

        assert!(matches!(result, Err(SessionStoreError::NotFound(_))));
    }
}
