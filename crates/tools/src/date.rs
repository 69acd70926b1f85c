//! Date tool: tells planners what day it is so schedules line up with
//! the calendar.

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use fitcoach_core::error::ToolError;
use fitcoach_core::tool::{Tool, ToolContext, ToolResult};
use serde::Serialize;

/// The fields returned by `get_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateInfo {
    /// `YYYY-MM-DD`
    pub current_date: String,
    pub year: i32,
    pub month: u32,
    /// 0 = Monday … 6 = Sunday
    pub weekday: u32,
    pub weekday_name: String,
}

impl DateInfo {
    pub fn for_date(date: NaiveDate) -> Self {
        let weekday = date.weekday();
        Self {
            current_date: date.format("%Y-%m-%d").to_string(),
            year: date.year(),
            month: date.month(),
            weekday: weekday.num_days_from_monday(),
            weekday_name: date.format("%A").to_string(),
        }
    }
}

/// Returns today's date in the local time zone, or a pinned date.
pub struct GetDateTool {
    fixed: Option<NaiveDate>,
}

impl GetDateTool {
    pub fn new() -> Self {
        Self { fixed: None }
    }

    /// Always report `date`, for deterministic runs.
    pub fn fixed(date: NaiveDate) -> Self {
        Self { fixed: Some(date) }
    }

    pub fn today(&self) -> DateInfo {
        DateInfo::for_date(self.fixed.unwrap_or_else(|| Local::now().date_naive()))
    }
}

impl Default for GetDateTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GetDateTool {
    fn name(&self) -> &str {
        "get_date"
    }

    fn description(&self) -> &str {
        "Get today's date: current_date (YYYY-MM-DD), year, month, weekday (0 = Monday … 6 = Sunday) \
         and weekday_name. Use it to anchor weekly schedules to real days."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let info = self.today();
        let data = serde_json::to_value(&info).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "get_date".into(),
            reason: e.to_string(),
        })?;
        Ok(ToolResult::ok("", data.to_string()).with_data(data))
    }
}
