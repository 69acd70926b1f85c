//! Memory trait: cross-session recall.
//!
//! After every turn the whole session is handed to the memory service;
//! agents later read it back through the `load_memory` tool. Entries are
//! scoped to `(app_name, user_id)` so users never see each other's history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::session::Session;

/// A single remembered utterance from a past session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,

    pub app_name: String,
    pub user_id: String,

    /// The session this entry was ingested from
    pub session_id: String,

    /// Who said it ("user" or an agent name)
    pub author: String,

    pub content: String,

    /// When the underlying message was produced
    pub timestamp: DateTime<Utc>,

    /// Keyword overlap with the query; zero outside search results
    #[serde(default)]
    pub score: f32,
}

/// Keyword lookup scoped to one user of one app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    pub app_name: String,
    pub user_id: String,

    pub text: String,

    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

impl MemoryQuery {
    pub fn new(app_name: impl Into<String>, user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            text: text.into(),
            limit: default_limit(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Long-term recall across sessions.
///
/// Backed by an in-process keyword index, or by a no-op when disabled.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// The service name (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// Ingest a whole session. Re-ingesting the same session replaces its
    /// previous entries.
    async fn add_session(&self, session: &Session) -> std::result::Result<(), MemoryError>;

    /// Best matches first, at most `query.limit` of them.
    async fn search(&self, query: MemoryQuery) -> std::result::Result<Vec<MemoryEntry>, MemoryError>;

    async fn count(&self) -> std::result::Result<usize, MemoryError>;

    async fn clear(&self) -> std::result::Result<(), MemoryError>;
}
