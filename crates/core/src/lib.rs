//! Shared vocabulary of the fitness coach harness.
//!
//! Models, tools, memory, session storage and agents each appear here as a
//! trait with the value types that cross it. Concrete implementations live
//! in sibling crates and the `fitcoach` binary wires them together.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod memory;
pub mod session;
pub mod agent;
pub mod event;

pub use error::{Error, Result};
pub use message::{Message, Role, Conversation, MessageToolCall};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolContext, ToolResult, ToolRegistry};
pub use memory::{MemoryEntry, MemoryQuery, MemoryService};
pub use session::{Session, SessionKey, SessionStore, SessionSummary, TurnState};
pub use agent::Agent;
pub use event::{DomainEvent, EventBus, TurnPhase};
