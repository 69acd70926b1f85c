//! No-op memory service: disables cross-session recall entirely.

use async_trait::async_trait;
use fitcoach_core::error::MemoryError;
use fitcoach_core::memory::{MemoryEntry, MemoryQuery, MemoryService};
use fitcoach_core::session::Session;

/// A memory service that stores nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryService for NoopMemory {
    fn name(&self) -> &str { "none" }

    async fn add_session(&self, _session: &Session) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn search(&self, _query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(0)
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitcoach_core::message::Message;
    use fitcoach_core::session::SessionKey;

    #[tokio::test]
    async fn noop_remembers_nothing() {
        let mut session = Session::new(SessionKey::new("agents", "u", "s"));
        session.events.push(Message::user("remember me"));

        NoopMemory.add_session(&session).await.unwrap();
        assert_eq!(NoopMemory.count().await.unwrap(), 0);
        assert!(NoopMemory
            .search(MemoryQuery::new("agents", "u", "remember"))
            .await
            .unwrap()
            .is_empty());
    }
}
