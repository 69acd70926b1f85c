//! Agent trait: anything callable with a text request inside a turn.

use async_trait::async_trait;
use crate::error::Result;
use crate::tool::ToolContext;

/// A named persona that turns a text request into a text answer.
///
/// Hosted-model agents implement this, and `AgentTool` adapts any agent
/// into a [`crate::Tool`] so one agent can delegate to another.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Shown to calling models when the agent is exposed as a tool.
    fn description(&self) -> &str;

    async fn run(&self, request: &str, ctx: &ToolContext) -> Result<String>;
}
