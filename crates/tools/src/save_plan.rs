//! Weekly plan tool: lets a planner keep its full 7-day structure in
//! session state, so later turns can show another day of the same week.

use async_trait::async_trait;
use fitcoach_core::error::ToolError;
use fitcoach_core::tool::{Tool, ToolContext, ToolResult};
use tracing::debug;

pub const SAVE_WEEKLY_PLAN: &str = "save_weekly_plan";

/// Writes the `plan` argument into one session-state slot.
pub struct SaveWeeklyPlanTool {
    slot: String,
}

impl SaveWeeklyPlanTool {
    pub fn new(slot: impl Into<String>) -> Self {
        Self { slot: slot.into() }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }
}

#[async_trait]
impl Tool for SaveWeeklyPlanTool {
    fn name(&self) -> &str {
        SAVE_WEEKLY_PLAN
    }

    fn description(&self) -> &str {
        "Save the complete 7-day plan, every day from Monday to Sunday, so later conversations \
         reuse the same week. Call it whenever you build a new week or change one."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "plan": {
                    "type": "string",
                    "description": "The whole week, one section per day"
                }
            },
            "required": ["plan"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let plan = arguments["plan"]
            .as_str()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("'plan' must be a non-empty string".into()))?;

        ctx.turn.set(&self.slot, serde_json::Value::String(plan.to_string()));
        debug!(slot = %self.slot, chars = plan.len(), "Saved weekly plan");

        Ok(ToolResult::ok("", format!("Weekly plan saved ({} characters).", plan.len())))
    }
}
