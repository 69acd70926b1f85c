//! Hosted-model agent and its tool-calling loop.
//!
//! Each request goes out as: system instruction, then the conversation so
//! far, plus the definitions of the agent's own tools. When the model asks
//! for tools, they run in order against the turn's [`ToolContext`] and their
//! outputs are appended before the model is asked again. The loop ends on
//! the first text-only answer or after `max_iterations` model calls.

use async_trait::async_trait;
use chrono::Utc;
use fitcoach_core::agent::Agent;
use fitcoach_core::error::Result;
use fitcoach_core::event::DomainEvent;
use fitcoach_core::message::{Conversation, Message, MessageToolCall};
use fitcoach_core::provider::{Provider, ProviderRequest};
use fitcoach_core::tool::{Tool, ToolCall, ToolContext, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returned when the model keeps calling tools past the iteration limit.
pub const MAX_ITERATIONS_REPLY: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// A configured hosted-model persona.
pub struct LlmAgent {
    /// Unique name, also used as the tool name when delegated to
    name: String,

    description: String,

    /// System instruction sent with every request
    instruction: String,

    model: String,

    provider: Arc<dyn Provider>,

    /// Tools this agent's model may call
    tools: ToolRegistry,

    /// Session-state key the final answer is written to
    output_key: Option<String>,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Maximum model calls per run
    max_iterations: usize,
}

impl LlmAgent {
    pub fn new(name: impl Into<String>, model: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            model: model.into(),
            provider,
            tools: ToolRegistry::new(),
            output_key: None,
            temperature: 0.7,
            max_tokens: None,
            max_iterations: 25,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Declare a tool. A tool with the same name replaces the earlier one.
    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    /// Write the final answer of every run into this session-state key.
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Drive the model over `conversation` until it answers in text.
    ///
    /// Every message the model produces, and every tool result, is appended
    /// to `conversation`. The system instruction is never stored there.
    pub async fn run_conversation(
        &self,
        conversation: &mut Conversation,
        ctx: &ToolContext,
    ) -> Result<String> {
        info!(
            agent = %self.name,
            session = %ctx.session_id,
            messages = conversation.len(),
            "Running agent"
        );

        let definitions = self.tools.definitions();

        for iteration in 1..=self.max_iterations {
            debug!(agent = %self.name, iteration, "Agent loop iteration");

            let mut messages = Vec::with_capacity(conversation.len() + 1);
            if !self.instruction.is_empty() {
                messages.push(Message::system(&self.instruction));
            }
            messages.extend(conversation.messages.iter().cloned());

            let mut request = ProviderRequest::new(&self.model, messages);
            request.temperature = self.temperature;
            request.max_tokens = self.max_tokens;
            request.tools = definitions.clone();

            let response = self.provider.complete(request).await?;

            if let Some(usage) = &response.usage {
                ctx.events.publish(DomainEvent::ModelResponded {
                    agent: self.name.clone(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            let message = response.message.with_author(&self.name);

            if message.tool_calls.is_empty() {
                let text = message.content.clone();
                conversation.push(message);
                if let Some(key) = &self.output_key {
                    ctx.turn.set(key.clone(), serde_json::Value::String(text.clone()));
                    debug!(agent = %self.name, key = %key, "Wrote output slot");
                }
                return Ok(text);
            }

            let tool_calls = message.tool_calls.clone();
            debug!(agent = %self.name, tool_count = tool_calls.len(), "Executing tool calls");
            conversation.push(message);

            for tc in &tool_calls {
                let output = self.dispatch(tc, ctx).await;
                conversation.push(Message::tool_result(&tc.id, output));
            }
        }

        warn!(
            agent = %self.name,
            iterations = self.max_iterations,
            "Max tool iterations reached, returning without an answer"
        );
        Ok(MAX_ITERATIONS_REPLY.into())
    }

    /// Run one tool call and render its outcome for the model.
    async fn dispatch(&self, tc: &MessageToolCall, ctx: &ToolContext) -> String {
        let arguments = if tc.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str(&tc.arguments) {
                Ok(value) => value,
                Err(e) => {
                    warn!(agent = %self.name, tool = %tc.name, error = %e, "Unparseable tool arguments");
                    return format!("Error: invalid arguments for {}: {e}", tc.name);
                }
            }
        };

        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        };

        let start = std::time::Instant::now();
        let result = self.tools.execute(&call, ctx).await;
        let duration_ms = whole_millis(start.elapsed());

        let (success, output) = match result {
            Ok(tool_result) => (tool_result.success, tool_result.output),
            Err(e) => {
                warn!(agent = %self.name, tool = %tc.name, error = %e, "Tool execution failed");
                (false, format!("Error: {e}"))
            }
        };

        ctx.events.publish(DomainEvent::ToolExecuted {
            agent: self.name.clone(),
            tool_name: tc.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        output
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    /// One fresh conversation holding just `request`.
    async fn run(&self, request: &str, ctx: &ToolContext) -> Result<String> {
        let mut conversation = Conversation::new();
        conversation.push(Message::user(request));
        self.run_conversation(&mut conversation, ctx).await
    }
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
fn whole_millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use fitcoach_core::error::{Error, ProviderError, ToolError};
    use fitcoach_core::message::Role;
    use fitcoach_core::tool::ToolResult;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echo the text back" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
            _ctx: &ToolContext,
        ) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or_default();
            Ok(ToolResult::ok("", format!("echo: {text}")))
        }
    }

    #[tokio::test]
    async fn simple_text_response() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello! How can I help?"));
        let agent = LlmAgent::new("coach", "mock-model", provider.clone())
            .with_instruction("You are a coach.");
        let ctx = ToolContext::detached("agents", "u");

        let mut conv = Conversation::new();
        conv.push(Message::user("Hello!"));
        let response = agent.run_conversation(&mut conv, &ctx).await.unwrap();

        assert_eq!(response, "Hello! How can I help?");
        // User + Assistant; the instruction is sent but not stored
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages[1].author(), "coach");

        let requests = provider.requests();
        let sent = &requests[0];
        assert_eq!(sent.messages[0].role, Role::System);
        assert_eq!(sent.messages[0].content, "You are a coach.");
        assert_eq!(sent.model, "mock-model");
    }

    #[tokio::test]
    async fn executes_tools_and_loops() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_tool_call("echo", serde_json::json!({"text": "hi"}))]),
            make_text_response("done"),
        ]));
        let agent = LlmAgent::new("coach", "mock-model", provider.clone())
            .with_tool(Box::new(EchoTool));
        let ctx = ToolContext::detached("agents", "u");

        let answer = agent.run("say hi", &ctx).await.unwrap();
        assert_eq!(answer, "done");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].tools[0].name, "echo");

        let tool_msg = requests[1].messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_msg.content, "echo: hi");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_echo"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_model() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_tool_call("nope", serde_json::json!({}))]),
            make_text_response("recovered"),
        ]));
        let agent = LlmAgent::new("coach", "mock-model", provider.clone());
        let ctx = ToolContext::detached("agents", "u");
        let mut events = ctx.events.subscribe();

        assert_eq!(agent.run("x", &ctx).await.unwrap(), "recovered");

        let tool_msg = provider.requests()[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .cloned()
            .unwrap();
        assert!(tool_msg.content.starts_with("Error:"));
        assert!(tool_msg.content.contains("nope"));

        let mut saw_failed_tool = false;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::ToolExecuted { success, tool_name, .. } = event.as_ref() {
                assert_eq!(tool_name, "nope");
                saw_failed_tool = !success;
            }
        }
        assert!(saw_failed_tool);
    }

    #[tokio::test]
    async fn bad_arguments_are_reported_to_model() {
        let mut call = make_tool_call("echo", serde_json::json!({}));
        call.arguments = "{not json".into();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![call]),
            make_text_response("ok"),
        ]));
        let agent = LlmAgent::new("coach", "mock-model", provider.clone())
            .with_tool(Box::new(EchoTool));
        let ctx = ToolContext::detached("agents", "u");

        agent.run("x", &ctx).await.unwrap();
        let tool_msg = provider.requests()[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .cloned()
            .unwrap();
        assert!(tool_msg.content.starts_with("Error: invalid arguments for echo"));
    }

    #[tokio::test]
    async fn output_key_is_written_to_turn_state() {
        let provider = Arc::new(SequentialMockProvider::single_text("Day 1: squats 3x10"));
        let agent = LlmAgent::new("workout_planner", "mock-model", provider)
            .with_output_key("workout_plan");
        let ctx = ToolContext::detached("agents", "u");

        agent.run("plan", &ctx).await.unwrap();
        assert!(ctx.turn.written_this_turn("workout_plan"));
        assert_eq!(ctx.turn.get_str("workout_plan").as_deref(), Some("Day 1: squats 3x10"));
    }

    #[tokio::test]
    async fn stops_at_max_iterations() {
        let responses = (0..3)
            .map(|_| make_tool_call_response(vec![make_tool_call("echo", serde_json::json!({"text": "again"}))]))
            .collect();
        let provider = Arc::new(SequentialMockProvider::new(responses));
        let agent = LlmAgent::new("coach", "mock-model", provider.clone())
            .with_tool(Box::new(EchoTool))
            .with_output_key("slot")
            .with_max_iterations(3);
        let ctx = ToolContext::detached("agents", "u");

        let answer = agent.run("loop", &ctx).await.unwrap();
        assert_eq!(answer, MAX_ITERATIONS_REPLY);
        assert_eq!(provider.call_count(), 3);
        assert!(!ctx.turn.written_this_turn("slot"));
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![Err(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let agent = LlmAgent::new("coach", "mock-model", provider);
        let ctx = ToolContext::detached("agents", "u");

        let err = agent.run("x", &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn sampling_settings_are_sent() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let agent = LlmAgent::new("coach", "m", provider.clone())
            .with_temperature(0.2)
            .with_max_tokens(512);
        agent.run("x", &ToolContext::detached("agents", "u")).await.unwrap();

        let requests = provider.requests();
        let sent = &requests[0];
        assert_eq!(sent.temperature, 0.2);
        assert_eq!(sent.max_tokens, Some(512));
        assert!(sent.tools.is_empty());
        // No instruction means no system message
        assert_eq!(sent.messages[0].role, Role::User);
    }

    #[test]
    fn tool_durations_saturate() {
        assert_eq!(whole_millis(std::time::Duration::from_millis(1500)), 1500);
        assert_eq!(whole_millis(std::time::Duration::MAX), u64::MAX);
    }
}
