//! Agent-as-tool: exposes any [`Agent`] to a calling model as a tool taking
//! a single `request` string.
//!
//! Session-state slots can be wired into the delegated prompt:
//! - `requires`: the slot must have been written earlier in the same turn,
//!   otherwise the call fails before the agent runs; its value is forwarded.
//! - `forwards`: the slot's current value is forwarded when present.
//! - `on_record`: the value the slot held when the turn started is
//!   forwarded as the plan on record.

use async_trait::async_trait;
use fitcoach_core::agent::Agent;
use fitcoach_core::error::ToolError;
use fitcoach_core::tool::{Tool, ToolContext, ToolResult};
use std::sync::Arc;
use tracing::debug;

pub struct AgentTool {
    agent: Arc<dyn Agent>,
    requires: Vec<String>,
    forwards: Vec<String>,
    on_record: Vec<String>,
}

impl AgentTool {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            agent,
            requires: Vec::new(),
            forwards: Vec::new(),
            on_record: Vec::new(),
        }
    }

    pub fn requires(mut self, slot: impl Into<String>) -> Self {
        self.requires.push(slot.into());
        self
    }

    pub fn forwards(mut self, slot: impl Into<String>) -> Self {
        self.forwards.push(slot.into());
        self
    }

    pub fn on_record(mut self, slot: impl Into<String>) -> Self {
        self.on_record.push(slot.into());
        self
    }

    /// The request text actually handed to the agent.
    fn compose(&self, request: &str, ctx: &ToolContext) -> String {
        let mut prompt = request.trim().to_string();

        for slot in self.requires.iter().chain(&self.forwards) {
            if let Some(value) = ctx.turn.get_str(slot) {
                prompt.push_str(&format!("\n\n[{slot} from this turn]\n{value}"));
            }
        }

        for slot in &self.on_record {
            if let Some(value) = ctx.turn.previous(slot).and_then(|v| v.as_str()) {
                prompt.push_str(&format!("\n\n[{slot} on record]\n{value}"));
            }
        }

        prompt
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        self.agent.name()
    }

    fn description(&self) -> &str {
        self.agent.description()
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "request": {
                    "type": "string",
                    "description": "What to ask this agent, including everything it needs to know about the user"
                }
            },
            "required": ["request"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let request = arguments["request"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'request' argument".into()))?;

        if let Some(missing) = self.requires.iter().find(|slot| !ctx.turn.written_this_turn(slot)) {
            return Err(ToolError::PreconditionFailed {
                tool_name: self.agent.name().to_string(),
                reason: format!(
                    "`{missing}` has not been produced in this turn yet; call the agent that writes it first"
                ),
            });
        }

        let prompt = self.compose(request, ctx);
        debug!(agent = %self.agent.name(), prompt_len = prompt.len(), "Delegating to agent");

        let answer = self
            .agent
            .run(&prompt, ctx)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.agent.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult::ok("", answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitcoach_core::error::Result;
    use fitcoach_core::session::TurnState;
    use fitcoach_core::event::EventBus;
    use serde_json::{Map, json};
    use std::sync::Mutex;

    /// Records what it was asked and answers with a fixed string.
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Agent for Recorder {
        fn name(&self) -> &str { "diet_planner" }
        fn description(&self) -> &str { "Plans meals" }
        async fn run(&self, request: &str, _ctx: &ToolContext) -> Result<String> {
            self.seen.lock().unwrap().push(request.to_string());
            Ok("Breakfast: oats".into())
        }
    }

    fn recorder() -> Arc<Recorder> {
        Arc::new(Recorder { seen: Mutex::new(Vec::new()) })
    }

    fn ctx_with(base: Map<String, serde_json::Value>) -> ToolContext {
        ToolContext::new(
            "agents",
            "u",
            "s1",
            Arc::new(TurnState::new(base)),
            Arc::new(EventBus::default()),
        )
    }

    #[tokio::test]
    async fn exposes_agent_identity() {
        let tool = AgentTool::new(recorder());
        assert_eq!(tool.name(), "diet_planner");
        assert_eq!(tool.description(), "Plans meals");
        assert_eq!(tool.parameters_schema()["required"][0], "request");
    }

    #[tokio::test]
    async fn missing_prerequisite_fails_without_running() {
        let agent = recorder();
        let tool = AgentTool::new(agent.clone()).requires("workout_plan");

        // A plan from an earlier turn does not count
        let mut base = Map::new();
        base.insert("workout_plan".into(), json!("old plan"));
        let ctx = ctx_with(base);

        let err = tool
            .execute(json!({"request": "plan meals"}), &ctx)
            .await
            .unwrap_err();
        match err {
            ToolError::PreconditionFailed { tool_name, reason } => {
                assert_eq!(tool_name, "diet_planner");
                assert!(reason.contains("workout_plan"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(agent.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prerequisite_is_forwarded_into_prompt() {
        let agent = recorder();
        let tool = AgentTool::new(agent.clone()).requires("workout_plan");
        let ctx = ctx_with(Map::new());
        ctx.turn.set("workout_plan", json!("Legs: squats 4x8"));

        let result = tool.execute(json!({"request": "plan meals"}), &ctx).await.unwrap();
        assert_eq!(result.output, "Breakfast: oats");

        let seen = agent.seen.lock().unwrap();
        assert!(seen[0].starts_with("plan meals"));
        assert!(seen[0].contains("[workout_plan from this turn]\nLegs: squats 4x8"));
    }

    #[tokio::test]
    async fn plan_on_record_comes_from_turn_start() {
        let agent = recorder();
        let tool = AgentTool::new(agent.clone()).on_record("diet_plan");

        let mut base = Map::new();
        base.insert("diet_plan".into(), json!("Monday: lentils"));
        let ctx = ctx_with(base);
        ctx.turn.set("diet_plan", json!("overwritten mid-turn"));

        tool.execute(json!({"request": "again"}), &ctx).await.unwrap();
        let seen = agent.seen.lock().unwrap();
        assert!(seen[0].contains("[diet_plan on record]\nMonday: lentils"));
        assert!(!seen[0].contains("overwritten"));
    }

    #[tokio::test]
    async fn absent_forwarded_slot_is_skipped() {
        let agent = recorder();
        let tool = AgentTool::new(agent.clone()).forwards("workout_plan").on_record("diet_plan");
        tool.execute(json!({"request": "hello"}), &ctx_with(Map::new())).await.unwrap();
        assert_eq!(agent.seen.lock().unwrap()[0], "hello");
    }

    #[tokio::test]
    async fn missing_request_is_invalid() {
        let tool = AgentTool::new(recorder());
        let err = tool.execute(json!({}), &ctx_with(Map::new())).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
