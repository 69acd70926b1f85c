//! In-memory session store: used by tests and `--ephemeral` runs.

use async_trait::async_trait;
use fitcoach_core::error::SessionError;
use fitcoach_core::message::Message;
use fitcoach_core::session::{Session, SessionKey, SessionStore, SessionSummary};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps every session in a map; nothing survives the process.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create(&self, key: &SessionKey) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(key) {
            return Err(SessionError::AlreadyExists(key.to_string()));
        }
        let session = Session::new(key.clone());
        sessions.insert(key.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<SessionSummary>, SessionError> {
        let sessions = self.sessions.read().await;
        let mut listed: Vec<SessionSummary> = sessions
            .values()
            .filter(|s| s.key.app_name == app_name && s.key.user_id == user_id)
            .map(|s| SessionSummary {
                key: s.key.clone(),
                event_count: s.events.len(),
                created_at: s.created_at,
                updated_at: s.updated_at,
            })
            .collect();
        listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(listed)
    }

    async fn append(
        &self,
        session: &mut Session,
        events: Vec<Message>,
        delta: Map<String, Value>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(&session.key)
            .ok_or_else(|| SessionError::NotFound(session.key.to_string()))?;

        stored.apply(events, delta);
        *session = stored.clone();
        Ok(())
    }
}
