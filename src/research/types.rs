//! Research-phase data model (§3, §4.5)

use serde::{Deserialize, Serialize};

use crate::browser::TabId;

/// One research-phase descriptor produced by the decomposition LLM call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub description: String,
    pub url: String,
    #[serde(rename = "extractionGoal")]
    pub extraction_goal: String,
}

/// The decomposition LLM call's parsed response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    #[serde(rename = "isResearch")]
    pub is_research: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(rename = "subTasks", default)]
    pub sub_tasks: Vec<SubTask>,
}

impl ResearchPlan {
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self { is_research: false, reasoning: reasoning.into(), sub_tasks: vec![] }
    }
}

/// Outcome of one sub-task's Agent Loop run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubTaskStatus {
    Success,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskResult {
    #[serde(rename = "tabId")]
    pub tab_id: TabId,
    pub sub_task: SubTask,
    pub status: SubTaskStatus,
    #[serde(rename = "extractedData")]
    pub extracted_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubTaskResult {
    pub fn status_emoji(&self) -> &'static str {
        match self.status {
            SubTaskStatus::Success => "\u{2705}",
            SubTaskStatus::Timeout => "\u{23F1}",
            SubTaskStatus::Error => "\u{274C}",
        }
    }
}
