//! The fitness agent roster.
//!
//! ```text
//! fitness_coordinator ── workout_planner ─┬─ web_search
//!        │                                ├─ load_memory
//!        │                                ├─ save_weekly_plan
//!        │                                └─ get_date
//!        ├────────────── diet_planner ────┬─ web_search
//!        │   (requires workout_plan)      ├─ load_memory
//!        │                                └─ get_date
//!        ├─ get_date
//!        └─ web_search
//! ```

use chrono::NaiveDate;
use fitcoach_config::AppConfig;
use fitcoach_core::memory::MemoryService;
use fitcoach_providers::ModelProviders;
use fitcoach_tools::{GetDateTool, LoadMemoryTool, SaveWeeklyPlanTool};
use std::sync::Arc;
use crate::agent_tool::AgentTool;
use crate::llm_agent::LlmAgent;
use crate::prompts;

pub const COORDINATOR: &str = "fitness_coordinator";
pub const WORKOUT_PLANNER: &str = "workout_planner";
pub const DIET_PLANNER: &str = "diet_planner";
pub const WEB_SEARCH: &str = "web_search";

/// Session-state key holding the latest workout plan.
pub const WORKOUT_SLOT: &str = "workout_plan";
/// Session-state key holding the whole 7-day workout structure.
pub const WEEKLY_WORKOUT_SLOT: &str = "weekly_workout_plan";
/// Session-state key holding the latest diet plan.
pub const DIET_SLOT: &str = "diet_plan";

/// Builds the coordinator and everything it delegates to.
pub struct FitnessTeam {
    providers: ModelProviders,
    memory: Arc<dyn MemoryService>,
    root_model: String,
    planner_model: String,
    search_model: String,
    temperature: f32,
    max_tokens: u32,
    max_iterations: usize,
    recall_limit: usize,
    today: Option<NaiveDate>,
}

impl FitnessTeam {
    pub fn new(config: &AppConfig, providers: ModelProviders, memory: Arc<dyn MemoryService>) -> Self {
        Self {
            providers,
            memory,
            root_model: config.models.root.clone(),
            planner_model: config.models.planner.clone(),
            search_model: config.models.search.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_iterations: config.max_tool_iterations,
            recall_limit: config.memory.search_limit,
            today: None,
        }
    }

    /// Pin what `get_date` reports.
    pub fn with_fixed_date(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    fn date_tool(&self) -> Box<GetDateTool> {
        Box::new(match self.today {
            Some(date) => GetDateTool::fixed(date),
            None => GetDateTool::new(),
        })
    }

    fn memory_tool(&self) -> Box<LoadMemoryTool> {
        Box::new(LoadMemoryTool::new(self.memory.clone()).with_default_limit(self.recall_limit))
    }

    fn agent(&self, name: &str, model: &str) -> LlmAgent {
        LlmAgent::new(name, model, self.providers.chat.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_max_iterations(self.max_iterations)
    }

    pub fn build(&self) -> LlmAgent {
        let search: Arc<LlmAgent> = Arc::new(
            LlmAgent::new(WEB_SEARCH, &self.search_model, self.providers.search.clone())
                .with_description(prompts::WEB_SEARCH_DESCRIPTION)
                .with_instruction(prompts::WEB_SEARCH_INSTRUCTION)
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens)
                .with_max_iterations(1),
        );

        let workout: Arc<LlmAgent> = Arc::new(
            self.agent(WORKOUT_PLANNER, &self.planner_model)
                .with_description(prompts::WORKOUT_PLANNER_DESCRIPTION)
                .with_instruction(prompts::WORKOUT_PLANNER_INSTRUCTION)
                .with_tool(Box::new(AgentTool::new(search.clone())))
                .with_tool(self.memory_tool())
                .with_tool(self.date_tool())
                .with_tool(Box::new(SaveWeeklyPlanTool::new(WEEKLY_WORKOUT_SLOT)))
                .with_output_key(WORKOUT_SLOT),
        );

        let diet: Arc<LlmAgent> = Arc::new(
            self.agent(DIET_PLANNER, &self.planner_model)
                .with_description(prompts::DIET_PLANNER_DESCRIPTION)
                .with_instruction(prompts::DIET_PLANNER_INSTRUCTION)
                .with_tool(Box::new(AgentTool::new(search.clone())))
                .with_tool(self.memory_tool())
                .with_tool(self.date_tool())
                .with_output_key(DIET_SLOT),
        );

        self.agent(COORDINATOR, &self.root_model)
            .with_description(prompts::COORDINATOR_DESCRIPTION)
            .with_instruction(prompts::COORDINATOR_INSTRUCTION)
            .with_tool(Box::new(
                AgentTool::new(workout)
                    .on_record(WEEKLY_WORKOUT_SLOT)
                    .on_record(WORKOUT_SLOT),
            ))
            .with_tool(Box::new(
                AgentTool::new(diet).requires(WORKOUT_SLOT).on_record(DIET_SLOT),
            ))
            .with_tool(self.date_tool())
            .with_tool(Box::new(AgentTool::new(search)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use fitcoach_core::agent::Agent;
    use fitcoach_core::message::Role;
    use fitcoach_core::provider::Provider;
    use fitcoach_core::tool::ToolContext;
    use fitcoach_memory::NoopMemory;

    fn team(chat: Arc<SequentialMockProvider>, search: Arc<SequentialMockProvider>) -> FitnessTeam {
        let providers = ModelProviders {
            chat: chat as Arc<dyn Provider>,
            search: search as Arc<dyn Provider>,
        };
        FitnessTeam::new(&AppConfig::default(), providers, Arc::new(NoopMemory))
            .with_fixed_date(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
    }

    #[test]
    fn roster_tools_match_roles() {
        let chat = Arc::new(SequentialMockProvider::new(vec![]));
        let search = Arc::new(SequentialMockProvider::new(vec![]));
        let coordinator = team(chat, search).build();

        assert_eq!(coordinator.name(), COORDINATOR);
        assert_eq!(coordinator.model(), "gemini-2.5-flash");
        assert_eq!(coordinator.output_key(), None);
        assert_eq!(
            coordinator.tools().names(),
            vec![DIET_PLANNER, "get_date", WEB_SEARCH, WORKOUT_PLANNER]
        );
    }

    #[tokio::test]
    async fn planners_reach_search_through_their_own_tool() {
        let chat = Arc::new(SequentialMockProvider::new(vec![
            // coordinator → workout planner
            make_tool_call_response(vec![make_tool_call(WORKOUT_PLANNER, serde_json::json!({"request": "beginner, dumbbells"}))]),
            // workout planner → web_search
            make_tool_call_response(vec![make_tool_call(WEB_SEARCH, serde_json::json!({"request": "goblet squat form"}))]),
            make_text_response("Goblet squat 3x12, rest 60s"),
            make_text_response("Here is your workout."),
        ]));
        let search = Arc::new(SequentialMockProvider::single_text("Keep the chest up.\n\nSources:\n- Form guide (https://example.com)"));
        let coordinator = team(chat.clone(), search.clone()).build();
        let ctx = ToolContext::detached("agents", "u");

        let reply = coordinator.run("new here", &ctx).await.unwrap();
        assert_eq!(reply, "Here is your workout.");

        let search_reqs = search.requests();
        let search_req = &search_reqs[0];
        assert_eq!(search_req.model, "gemini-2.5-flash-lite");
        assert!(search_req.tools.is_empty());
        assert_eq!(last_user_text(search_req), "goblet squat form");

        let requests = chat.requests();
        let planner_req = &requests[1];
        assert_eq!(planner_req.model, "gemini-2.5-flash-lite");
        let names: Vec<&str> = planner_req.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_date", "load_memory", "save_weekly_plan", WEB_SEARCH]);

        // Search summary went back to the planner as a tool result
        let tool_msg = requests[2].messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_msg.content.contains("Sources:"));

        assert_eq!(ctx.turn.get_str(WORKOUT_SLOT).as_deref(), Some("Goblet squat 3x12, rest 60s"));
    }
}
