//! Turns domain events into `tracing` records.
//!
//! Every model round trip, tool call, phase change and write-back that
//! crosses the [`EventBus`] is logged with structured fields, and a running
//! [`EventTally`] is kept so the totals can be reported at shutdown.

use fitcoach_core::event::{DomainEvent, EventBus};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Totals over everything the logger has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTally {
    pub phase_changes: usize,
    pub model_calls: usize,
    pub tokens_used: u64,
    pub tool_calls: usize,
    pub failed_tool_calls: usize,
    pub write_backs: usize,
    pub errors: usize,
    /// Events dropped because the logger fell behind the bus
    pub missed: u64,
}

impl EventTally {
    /// Log `event` and add it to the totals.
    pub fn record(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::TurnPhaseChanged { session_id, phase, .. } => {
                self.phase_changes += 1;
                debug!(session = %session_id, ?phase, "Turn phase");
            }
            DomainEvent::ModelResponded { agent, model, tokens_used, .. } => {
                self.model_calls += 1;
                self.tokens_used += u64::from(*tokens_used);
                info!(agent = %agent, model = %model, tokens = tokens_used, "Model responded");
            }
            DomainEvent::ToolExecuted { agent, tool_name, success, duration_ms, .. } => {
                self.tool_calls += 1;
                if *success {
                    info!(agent = %agent, tool = %tool_name, duration_ms, "Tool call");
                } else {
                    self.failed_tool_calls += 1;
                    warn!(agent = %agent, tool = %tool_name, duration_ms, "Tool call failed");
                }
            }
            DomainEvent::MemoryWriteBack { session_id, success, .. } => {
                self.write_backs += 1;
                debug!(session = %session_id, success, "Memory write-back");
            }
            DomainEvent::ErrorOccurred { context, error_message, .. } => {
                self.errors += 1;
                warn!(context = %context, error = %error_message, "Turn error");
            }
        }
    }
}

/// Subscribe to `events` and log until the bus is dropped.
///
/// The subscription is taken before this returns, so nothing published
/// afterwards is missed. The handle resolves to the final tally.
pub fn spawn_event_logger(events: &EventBus) -> JoinHandle<EventTally> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        let mut tally = EventTally::default();
        loop {
            match rx.recv().await {
                Ok(event) => tally.record(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tally.missed += skipped;
                    warn!(skipped, "Event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!(
            model_calls = tally.model_calls,
            tokens = tally.tokens_used,
            tool_calls = tally.tool_calls,
            errors = tally.errors,
            "Event log closed"
        );
        tally
    })
}
