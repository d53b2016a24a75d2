//! Research Orchestrator (§4.5): decompose one prompt into parallel per-tab
//! sub-tasks, run them concurrently, and synthesize their findings.

pub mod orchestrator;
pub mod types;

pub use orchestrator::ResearchOrchestrator;
pub use types::{ResearchPlan, SubTask, SubTaskResult, SubTaskStatus};
