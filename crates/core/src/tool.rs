//! What an agent's model may call mid-generation.
//!
//! Three kinds of tool exist in this harness: other agents wrapped as
//! tools, the date utility, and the memory reader. All of them see the
//! same [`ToolContext`] for the turn they run in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::ToolError;
use crate::event::EventBus;
use crate::provider::ToolDefinition;
use crate::session::TurnState;

/// A decoded tool invocation, arguments already parsed from the model's JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id echoed back on the result message
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub success: bool,
    /// Text handed back to the model
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result. The registry fills in `call_id`.
    pub fn ok(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Per-turn view handed to every agent and tool.
///
/// Cloning is cheap: state and the event bus are shared, so a slot written
/// by a nested agent is visible to the coordinator that called it.
#[derive(Clone)]
pub struct ToolContext {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub turn: Arc<TurnState>,
    pub events: Arc<EventBus>,
}

impl ToolContext {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        turn: Arc<TurnState>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            turn,
            events,
        }
    }

    /// Empty state and a private bus. Used outside a runner turn.
    pub fn detached(app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::new(
            app_name,
            user_id,
            "detached",
            Arc::new(TurnState::default()),
            Arc::new(EventBus::default()),
        )
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ToolContext({}/{}/{})", self.app_name, self.user_id, self.session_id)
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Tools owned by one agent, keyed by name.
///
/// Ordered so the tool list sent to the model is the same on every request.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tool`, replacing any earlier tool of the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Runs `call` and stamps its id onto the result.
    pub async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError> {
        let Some(tool) = self.get(&call.name) else {
            return Err(ToolError::NotFound(call.name.clone()));
        };
        let result = tool.execute(call.arguments.clone(), ctx).await?;
        Ok(ToolResult {
            call_id: call.id.clone(),
            ..result
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
