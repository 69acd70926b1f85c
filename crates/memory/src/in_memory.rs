//! In-memory memory service: keyword recall over ingested sessions.
//!
//! Nothing survives a restart; sessions are re-ingested after every turn,
//! so recall covers whatever has been discussed since startup.

use async_trait::async_trait;
use fitcoach_core::error::MemoryError;
use fitcoach_core::memory::{MemoryEntry, MemoryQuery, MemoryService};
use fitcoach_core::message::Role;
use fitcoach_core::session::{Session, SessionKey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Stores user and agent utterances per session and matches them by keyword.
pub struct InMemoryMemoryService {
    sessions: Arc<RwLock<HashMap<SessionKey, Vec<MemoryEntry>>>>,
}

impl InMemoryMemoryService {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased alphanumeric words, deduplicated.
fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn entries_from(session: &Session) -> Vec<MemoryEntry> {
    session
        .events
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| MemoryEntry {
            id: m.id.clone(),
            app_name: session.key.app_name.clone(),
            user_id: session.key.user_id.clone(),
            session_id: session.key.session_id.clone(),
            author: m.author().to_string(),
            content: m.content.clone(),
            timestamp: m.timestamp,
            score: 0.0,
        })
        .collect()
}

#[async_trait]
impl MemoryService for InMemoryMemoryService {
    fn name(&self) -> &str { "in_memory" }

    async fn add_session(&self, session: &Session) -> Result<(), MemoryError> {
        let entries = entries_from(session);
        debug!(
            session = %session.key,
            entries = entries.len(),
            "Ingesting session into memory"
        );
        self.sessions.write().await.insert(session.key.clone(), entries);
        Ok(())
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let query_words = words(&query.text);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let sessions = self.sessions.read().await;
        let mut results: Vec<MemoryEntry> = sessions
            .iter()
            .filter(|(key, _)| key.app_name == query.app_name && key.user_id == query.user_id)
            .flat_map(|(_, entries)| entries.iter())
            .filter_map(|e| {
                let matched = words(&e.content).intersection(&query_words).count();
                (matched > 0).then(|| {
                    let mut hit = e.clone();
                    hit.score = matched as f32;
                    hit
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        results.truncate(query.limit);

        Ok(results)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.sessions.read().await.values().map(Vec::len).sum())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.sessions.write().await.clear();
        Ok(())
    }
}
