//! Session Store - Interface for holding live exam sessions.
//!
//! A session pairs one `ConversationEngine` with its metadata. The engine
//! sits behind an async mutex so each session has at most one turn in
//! flight; distinct sessions never contend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::conversation::ConversationEngine;
use crate::domain::foundation::{CaseId, SessionId, StudentId, Timestamp};

/// Errors that can occur during session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session already exists: {0}")]
    AlreadyExists(SessionId),
}

/// Bookkeeping kept alongside each engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub session_id: SessionId,
    pub case_id: CaseId,
    pub student_id: Option<StudentId>,
    pub started_at: Timestamp,
    pub last_activity: Timestamp,
}

impl SessionMetadata {
    pub fn new(session_id: SessionId, case_id: CaseId, student_id: Option<StudentId>) -> Self {
        let now = Timestamp::now();
        Self {
            session_id,
            case_id,
            student_id,
            started_at: now,
            last_activity: now,
        }
    }
}

/// A live session: shared engine handle plus a metadata snapshot.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub metadata: SessionMetadata,
    pub engine: Arc<Mutex<ConversationEngine>>,
}

impl SessionEntry {
    pub fn new(metadata: SessionMetadata, engine: ConversationEngine) -> Self {
        Self {
            metadata,
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.metadata.session_id
    }
}

/// Port for the live-session registry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a new session.
    ///
    /// # Errors
    /// Returns `SessionStoreError::AlreadyExists` if the id is taken.
    async fn insert(&self, entry: SessionEntry) -> Result<(), SessionStoreError>;

    /// Fetch a session handle with its current metadata.
    async fn get(&self, session_id: SessionId) -> Result<SessionEntry, SessionStoreError>;

    /// Record activity now.
    async fn touch(&self, session_id: SessionId) -> Result<(), SessionStoreError>;

    /// Unregister a session and hand it back.
    async fn remove(&self, session_id: SessionId) -> Result<SessionEntry, SessionStoreError>;

    /// Ids of sessions with no activity for longer than `timeout` as of `now`.
    async fn idle_sessions(&self, timeout: Duration, now: Timestamp) -> Vec<SessionId>;

    /// Number of live sessions.
    async fn count(&self) -> usize;
}
