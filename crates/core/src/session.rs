//! Session domain: persisted record of one conversation's turns and state.
//!
//! A [`Session`] is identified by a [`SessionKey`]. Its `state` map holds
//! agent output slots (`workout_plan`, `diet_plan`) across turns; its
//! `events` hold every message exchanged with the coordinator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Mutex;
use crate::error::SessionError;
use crate::message::Message;

/// Identifies one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// A stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,

    /// Output slots and other keys written by agents
    #[serde(default)]
    pub state: Map<String, Value>,

    /// Ordered messages
    #[serde(default)]
    pub events: Vec<Message>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            state: Map::new(),
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.key.session_id
    }

    /// Read a string slot from session state.
    pub fn state_str(&self, key: &str) -> Option<&str> {
        self.state.get(key).and_then(|v| v.as_str())
    }

    /// Apply a turn's messages and state delta in memory.
    pub fn apply(&mut self, events: Vec<Message>, delta: Map<String, Value>) {
        self.events.extend(events);
        self.state.extend(delta);
        self.updated_at = Utc::now();
    }
}

/// A lightweight listing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub event_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session state as seen during a single turn.
///
/// Reads see the delta first, then the snapshot taken at turn start.
/// Writes only touch the delta, which the runner persists at turn end.
#[derive(Debug, Default)]
pub struct TurnState {
    base: Map<String, Value>,
    delta: Mutex<Map<String, Value>>,
}

impl TurnState {
    pub fn new(base: Map<String, Value>) -> Self {
        Self {
            base,
            delta: Mutex::new(Map::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let delta = self.delta.lock().unwrap_or_else(|e| e.into_inner());
        delta.get(key).or_else(|| self.base.get(key)).cloned()
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        let mut delta = self.delta.lock().unwrap_or_else(|e| e.into_inner());
        delta.insert(key.into(), value);
    }

    /// Whether `key` was written since the turn started.
    pub fn written_this_turn(&self, key: &str) -> bool {
        let delta = self.delta.lock().unwrap_or_else(|e| e.into_inner());
        delta.contains_key(key)
    }

    /// The value `key` held when the turn started.
    pub fn previous(&self, key: &str) -> Option<&Value> {
        self.base.get(key)
    }

    /// A copy of everything written during this turn.
    pub fn delta(&self) -> Map<String, Value> {
        self.delta.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// The core SessionStore trait.
///
/// Implementations: SQLite (persistent), in-memory (tests, `--ephemeral`).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Create an empty session. Fails if the key is taken.
    async fn create(&self, key: &SessionKey) -> std::result::Result<Session, SessionError>;

    /// Load a session with all its events.
    async fn get(&self, key: &SessionKey) -> std::result::Result<Option<Session>, SessionError>;

    /// List sessions for a user, most recently updated first.
    async fn list(
        &self,
        app_name: &str,
        user_id: &str,
    ) -> std::result::Result<Vec<SessionSummary>, SessionError>;

    /// Persist a turn: append `events` and merge `delta` into the state.
    /// `session` is updated in place to match what was stored.
    async fn append(
        &self,
        session: &mut Session,
        events: Vec<Message>,
        delta: Map<String, Value>,
    ) -> std::result::Result<(), SessionError>;

    /// Fetch the session, creating it when it does not exist yet.
    async fn get_or_create(&self, key: &SessionKey) -> std::result::Result<Session, SessionError> {
        match self.get(key).await? {
            Some(session) => Ok(session),
            None => self.create(key).await,
        }
    }

    /// Release underlying resources (connection pools). Called at shutdown.
    async fn close(&self) {}
}
