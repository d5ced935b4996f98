//! In-Memory Session Store Adapter
//!
//! Keeps live sessions in a process-local map. Sessions do not survive a
//! restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::application::session::{SessionEntry, SessionStore, SessionStoreError};
use crate::domain::foundation::{SessionId, Timestamp};

/// In-memory registry of live sessions
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, entry: SessionEntry) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let session_id = entry.session_id();
        if sessions.contains_key(&session_id) {
            return Err(SessionStoreError::AlreadyExists(session_id));
        }
        sessions.insert(session_id, entry);
        Ok(())
    }

    async fn get(&self, session_id: SessionId) -> Result<SessionEntry, SessionStoreError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or(SessionStoreError::NotFound(session_id))
    }

    async fn touch(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&session_id)
            .ok_or(SessionStoreError::NotFound(session_id))?;
        entry.metadata.last_activity = Timestamp::now();
        Ok(())
    }

    async fn remove(&self, session_id: SessionId) -> Result<SessionEntry, SessionStoreError> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(SessionStoreError::NotFound(session_id))
    }

    async fn idle_sessions(&self, timeout: Duration, now: Timestamp) -> Vec<SessionId> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|entry| entry.metadata.last_activity.is_older_than(timeout, &now))
            .map(SessionEntry::session_id)
            .collect()
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
