//! Post-turn hooks.
//!
//! Hooks run after the turn's events have been persisted and are awaited
//! before the turn completes.

use async_trait::async_trait;
use chrono::Utc;
use fitcoach_config::WriteBackPolicy;
use fitcoach_core::error::Result;
use fitcoach_core::event::DomainEvent;
use fitcoach_core::memory::MemoryService;
use fitcoach_core::session::{Session, SessionStore};
use fitcoach_core::tool::ToolContext;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait AfterTurnHook: Send + Sync {
    fn name(&self) -> &str;

    /// `session` already includes the turn that just finished.
    async fn after_turn(&self, session: &Session, ctx: &ToolContext) -> Result<()>;
}

/// Submits the whole session to the memory service so later sessions can
/// recall it through `load_memory`.
pub struct MemoryWriteBack {
    memory: Arc<dyn MemoryService>,
    policy: WriteBackPolicy,
}

impl MemoryWriteBack {
    pub fn new(memory: Arc<dyn MemoryService>, policy: WriteBackPolicy) -> Self {
        Self { memory, policy }
    }
}

#[async_trait]
impl AfterTurnHook for MemoryWriteBack {
    fn name(&self) -> &str {
        "memory_write_back"
    }

    async fn after_turn(&self, session: &Session, ctx: &ToolContext) -> Result<()> {
        let outcome = self.memory.add_session(session).await;

        ctx.events.publish(DomainEvent::MemoryWriteBack {
            session_id: session.id().to_string(),
            success: outcome.is_ok(),
            timestamp: Utc::now(),
        });

        match outcome {
            Ok(()) => {
                debug!(session = %session.key, backend = self.memory.name(), "Session written to memory");
                Ok(())
            }
            Err(e) => match self.policy {
                WriteBackPolicy::Log => {
                    warn!(session = %session.key, error = %e, "Memory write-back failed");
                    Ok(())
                }
                WriteBackPolicy::Block => Err(e.into()),
            },
        }
    }
}

/// Load every stored session of `user_id` into `memory`.
///
/// The in-memory service starts empty; this lets `load_memory` recall
/// conversations from earlier runs. Returns the number of sessions loaded.
pub async fn ingest_stored_sessions(
    sessions: &dyn SessionStore,
    memory: &dyn MemoryService,
    app_name: &str,
    user_id: &str,
) -> Result<usize> {
    let mut loaded = 0;
    for summary in sessions.list(app_name, user_id).await? {
        if let Some(session) = sessions.get(&summary.key).await? {
            memory.add_session(&session).await?;
            loaded += 1;
        }
    }
    debug!(user = user_id, sessions = loaded, "Ingested stored sessions into memory");
    Ok(loaded)
}
