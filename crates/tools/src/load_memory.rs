//! Memory recall tool: lets a planner look up what the user said in
//! earlier sessions (goals, injuries, food preferences).
//!
//! Searches are scoped to the app and user of the current turn.

use async_trait::async_trait;
use fitcoach_core::error::ToolError;
use fitcoach_core::memory::{MemoryQuery, MemoryService};
use fitcoach_core::tool::{Tool, ToolContext, ToolResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on what a model may request in one call.
const MAX_LIMIT: usize = 50;

pub struct LoadMemoryTool {
    memory: Arc<dyn MemoryService>,
    default_limit: usize,
}

impl LoadMemoryTool {
    pub fn new(memory: Arc<dyn MemoryService>) -> Self {
        Self {
            memory,
            default_limit: 10,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.clamp(1, MAX_LIMIT);
        self
    }
}

#[derive(Debug, Serialize)]
struct Recalled {
    author: String,
    content: String,
    timestamp: String,
    session_id: String,
}

#[async_trait]
impl Tool for LoadMemoryTool {
    fn name(&self) -> &str {
        "load_memory"
    }

    fn description(&self) -> &str {
        "Search what this user said in earlier conversations: goals, injuries, schedule, food \
         preferences, previous plans. Pass a few keywords as the query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to look for in past conversations"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of memories to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let limit = arguments["limit"]
            .as_u64()
            .map(|l| (l as usize).clamp(1, MAX_LIMIT))
            .unwrap_or(self.default_limit);

        let entries = self
            .memory
            .search(MemoryQuery::new(&ctx.app_name, &ctx.user_id, query).with_limit(limit))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "load_memory".into(),
                reason: e.to_string(),
            })?;

        debug!(user = %ctx.user_id, query, hits = entries.len(), "Memory recall");

        if entries.is_empty() {
            return Ok(ToolResult::ok("", format!("No memories found matching '{query}'.")));
        }

        let recalled: Vec<Recalled> = entries
            .into_iter()
            .map(|e| Recalled {
                author: e.author,
                content: e.content,
                timestamp: e.timestamp.to_rfc3339(),
                session_id: e.session_id,
            })
            .collect();
        let data = serde_json::json!({ "memories": recalled });

        Ok(ToolResult::ok("", data.to_string()).with_data(data))
    }
}
