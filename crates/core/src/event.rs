//! Turn lifecycle events.
//!
//! The runner, agents and hooks publish onto a shared [`EventBus`]; the CLI
//! and tests subscribe to watch a turn move through its phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Where the runner is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingInput,
    Coordinating,
    Responded,
    WritingBack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    TurnPhaseChanged {
        session_id: String,
        phase: TurnPhase,
        timestamp: DateTime<Utc>,
    },

    /// One model round trip finished for `agent`.
    ModelResponded {
        agent: String,
        model: String,
        tokens_used: u32,
        timestamp: DateTime<Utc>,
    },

    ToolExecuted {
        agent: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    MemoryWriteBack {
        session_id: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// A turn failed; `context` names where.
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Shorthand for a phase change stamped now.
    pub fn phase(session_id: impl Into<String>, phase: TurnPhase) -> Self {
        Self::TurnPhaseChanged {
            session_id: session_id.into(),
            phase,
            timestamp: Utc::now(),
        }
    }
}

/// Fan-out of [`DomainEvent`]s over a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events; publishers never block.
pub struct EventBus {
    tx: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: DomainEvent) {
        // Err only means nobody is listening
        let _ = self.tx.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_sees_tool_execution() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolExecuted {
            agent: "fitness_coordinator".into(),
            tool_name: "get_date".into(),
            success: true,
            duration_ms: 1,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        let DomainEvent::ToolExecuted { tool_name, success, .. } = event.as_ref() else {
            panic!("expected ToolExecuted, got {event:?}");
        };
        assert_eq!(tool_name, "get_date");
        assert!(*success);
    }

    #[tokio::test]
    async fn phase_shorthand() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(DomainEvent::phase("s1", TurnPhase::WritingBack));

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::TurnPhaseChanged { session_id, phase: TurnPhase::WritingBack, .. } if session_id == "s1"
        ));
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::phase("s1", TurnPhase::Coordinating));
    }
}
