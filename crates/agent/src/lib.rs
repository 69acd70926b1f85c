//! The agent layer of FitCoach.
//!
//! A turn flows through:
//!
//! 1. [`Runner::run_turn`] loads the session and builds the turn context
//! 2. the coordinator ([`LlmAgent`]) talks to its model, delegating to the
//!    workout and diet planners through [`AgentTool`]s
//! 3. the planners write their answers into output slots
//! 4. the runner persists the turn and runs [`AfterTurnHook`]s
//!
//! [`chat_loop`] drives the runner from a line-based terminal, and
//! [`spawn_event_logger`] traces everything published on the event bus.

pub mod agent_tool;
pub mod chat;
pub mod fitness;
pub mod hooks;
pub mod llm_agent;
pub mod logging;
pub mod prompts;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent_tool::AgentTool;
pub use chat::chat_loop;
pub use fitness::FitnessTeam;
pub use hooks::{AfterTurnHook, MemoryWriteBack, ingest_stored_sessions};
pub use llm_agent::LlmAgent;
pub use logging::{EventTally, spawn_event_logger};
pub use runner::{Runner, TurnOutcome};
