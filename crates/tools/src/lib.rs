//! Local tool implementations for FitCoach.
//!
//! These are the tools that run in-process. Agent-backed tools
//! (`workout_planner`, `diet_planner`, `web_search`) live in the agent crate.

pub mod date;
pub mod load_memory;
pub mod save_plan;

pub use date::{DateInfo, GetDateTool};
pub use load_memory::LoadMemoryTool;
pub use save_plan::{SAVE_WEEKLY_PLAN, SaveWeeklyPlanTool};
