//! Research Orchestrator (§4.5): decompose → parallel sub-tasks → aggregate.
//!
//! Phase 2's settle-all fan-out uses a `tokio::task::JoinSet` to run
//! independent sub-tasks concurrently and collect every result without one
//! failure aborting its peers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::agent::{AgentLoop, AgentRuntime, CancellationFlag, LoopOutcome};
use crate::browser::{DebuggerChannel, TabRegistry};
use crate::contracts::{GenerateOptions, LlmProvider};
use crate::core::config::{AgentConfig, BrowserConfig, ResearchConfig};
use crate::core::Result;

use super::types::{ResearchPlan, SubTask, SubTaskResult, SubTaskStatus};

pub struct ResearchOrchestrator {
    llm: Arc<dyn LlmProvider>,
    channel: Arc<DebuggerChannel>,
    registry: Arc<TabRegistry>,
    research_config: ResearchConfig,
    agent_config: AgentConfig,
    browser_config: BrowserConfig,
    abort: CancellationFlag,
}

impl ResearchOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        channel: Arc<DebuggerChannel>,
        registry: Arc<TabRegistry>,
        research_config: ResearchConfig,
        agent_config: AgentConfig,
        browser_config: BrowserConfig,
        abort: CancellationFlag,
    ) -> Self {
        Self { llm, channel, registry, research_config, agent_config, browser_config, abort }
    }

    /// Runs all three phases, returning the final synthesis string, or a
    /// fallback message directing the caller to single-tab agent mode when
    /// decomposition does not yield a genuine research task.
    pub async fn run(&self, user_prompt: &str, mut progress: impl FnMut(&str)) -> Result<String> {
        progress("Planning...");
        let plan = self.decompose(user_prompt).await?;

        if !plan.is_research || plan.sub_tasks.len() < 2 {
            return Ok(format!(
                "This doesn't look like a multi-source research task ({}). Try running it as a single browser agent instead.",
                if plan.reasoning.is_empty() { "not enough independent sources" } else { &plan.reasoning }
            ));
        }

        let sub_tasks: Vec<SubTask> = plan.sub_tasks.into_iter().take(self.research_config.max_tabs).collect();
        progress(&format!("Opening {} tabs...", sub_tasks.len()));

        let results = self.run_sub_tasks(sub_tasks, &mut progress).await;

        progress("Synthesizing...");
        let synthesis = self.aggregate(user_prompt, &results).await?;

        self.channel.detach_all().await.ok();

        Ok(synthesis)
    }

    /// Phase 1 — one LLM call producing `{isResearch, reasoning, subTasks}`.
    async fn decompose(&self, user_prompt: &str) -> Result<ResearchPlan> {
        let response = self
            .llm
            .call(DECOMPOSE_SYSTEM_PROMPT, &[crate::core::types::Message::user(1, user_prompt, 0)], &[], None)
            .await?;

        let cleaned = strip_markdown_fences(&response.content);
        match serde_json::from_str::<ResearchPlan>(&cleaned) {
            Ok(mut plan) => {
                if plan.sub_tasks.len() < 2 {
                    plan.is_research = false;
                }
                Ok(plan)
            }
            Err(_) => Ok(ResearchPlan::fallback("failed to parse decomposition response")),
        }
    }

    /// Phase 2 — one tab + one sub-task Agent Loop per sub-task, settled via `JoinSet`.
    ///
    /// Each sub-task's `AgentLoop` reports its own progress ("Navigating...",
    /// "Reading page (N elements)", "Data extracted ✓") over an mpsc channel
    /// shared by every spawned task; those messages are forwarded to the
    /// caller's progress stream as they arrive, not just once a sub-task
    /// settles (§4.5 Phase 2(iv)).
    async fn run_sub_tasks(&self, sub_tasks: Vec<SubTask>, progress: &mut impl FnMut(&str)) -> Vec<SubTaskResult> {
        let mut set: JoinSet<SubTaskResult> = JoinSet::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        for sub_task in sub_tasks {
            let llm = self.llm.clone();
            let channel = self.channel.clone();
            let registry = self.registry.clone();
            let agent_config = self.agent_config.clone();
            let browser_config = self.browser_config.clone();
            let abort = self.abort.clone();
            let initial_settle_ms = self.research_config.initial_settle_ms;
            let timeout_secs = self.research_config.sub_task_timeout_secs;
            let progress_tx = tx.clone();

            set.spawn(async move {
                run_one_sub_task(
                    llm,
                    channel,
                    registry,
                    agent_config,
                    browser_config,
                    abort,
                    sub_task,
                    initial_settle_ms,
                    timeout_secs,
                    progress_tx,
                )
                .await
            });
        }
        drop(tx);

        let mut results = Vec::new();
        loop {
            tokio::select! {
                Some(message) = rx.recv() => {
                    progress(&message);
                }
                joined = set.join_next(), if !set.is_empty() => {
                    match joined {
                        Some(Ok(result)) => {
                            progress(&format!("{} {}", result.status_emoji(), result.sub_task.url));
                            results.push(result);
                        }
                        Some(Err(panic)) => {
                            progress("A sub-task panicked");
                            let _ = panic;
                        }
                        None => {}
                    }
                }
                else => break,
            }
        }
        results
    }

    /// Phase 3 — one LLM call synthesizing all per-source results.
    async fn aggregate(&self, user_prompt: &str, results: &[SubTaskResult]) -> Result<String> {
        let mut blocks = String::new();
        for (i, result) in results.iter().enumerate() {
            blocks.push_str(&format!(
                "Source {}: {} {}\nGoal: {}\n",
                i + 1,
                result.status_emoji(),
                result.sub_task.url,
                result.sub_task.extraction_goal
            ));
            if let Some(error) = &result.error {
                blocks.push_str(&format!("Error: {}\n\n", error));
            } else {
                blocks.push_str(&format!("Data: {}\n\n", result.extracted_data));
            }
        }

        let prompt = format!(
            "User asked: {}\n\nHere is what was found across {} sources:\n\n{}\nSynthesize a single, direct answer.",
            user_prompt,
            results.len(),
            blocks
        );

        let response = self
            .llm
            .call(
                AGGREGATE_SYSTEM_PROMPT,
                &[crate::core::types::Message::user(1, prompt, 0)],
                &[],
                Some(GenerateOptions { temperature: Some(0.3), max_tokens: None }),
            )
            .await?;

        Ok(response.content)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_one_sub_task(
    llm: Arc<dyn LlmProvider>,
    channel: Arc<DebuggerChannel>,
    registry: Arc<TabRegistry>,
    agent_config: AgentConfig,
    browser_config: BrowserConfig,
    abort: CancellationFlag,
    sub_task: SubTask,
    initial_settle_ms: u64,
    timeout_secs: u64,
    progress_tx: mpsc::UnboundedSender<String>,
) -> SubTaskResult {
    let tab_id = match registry.create_tab(&sub_task.url, &sub_task.description).await {
        Ok(id) => id,
        Err(e) => {
            return SubTaskResult {
                tab_id: 0,
                sub_task,
                status: SubTaskStatus::Error,
                extracted_data: String::new(),
                error: Some(e.to_string()),
            }
        }
    };

    let _ = channel.attach(tab_id).await;
    let _ = registry.attach(tab_id).await;

    tokio::time::sleep(Duration::from_millis(initial_settle_ms)).await;

    let runtime = Arc::new(AgentRuntime::with_shared_abort(abort));
    let mut agent_loop = AgentLoop::new_sub_task(
        llm,
        channel.clone(),
        registry.clone(),
        runtime,
        agent_config,
        browser_config,
        tab_id,
        &sub_task.extraction_goal,
    )
    .with_progress(move |message: &str| {
        let _ = progress_tx.send(message.to_string());
    });

    let prompt = format!("{} (goal: {})", sub_task.description, sub_task.extraction_goal);

    match tokio::time::timeout(Duration::from_secs(timeout_secs), agent_loop.run(&prompt)).await {
        Ok(Ok(LoopOutcome::Done(data))) => SubTaskResult {
            tab_id,
            sub_task,
            status: SubTaskStatus::Success,
            extracted_data: data,
            error: None,
        },
        Ok(Ok(LoopOutcome::Cancelled)) => SubTaskResult {
            tab_id,
            sub_task,
            status: SubTaskStatus::Error,
            extracted_data: String::new(),
            error: Some("cancelled".to_string()),
        },
        Ok(Ok(LoopOutcome::StepBudgetExhausted(text))) => SubTaskResult {
            tab_id,
            sub_task,
            status: SubTaskStatus::Error,
            extracted_data: text,
            error: Some("step budget exhausted".to_string()),
        },
        Ok(Err(e)) => SubTaskResult {
            tab_id,
            sub_task,
            status: SubTaskStatus::Error,
            extracted_data: String::new(),
            error: Some(e.to_string()),
        },
        Err(_) => {
            let snapshot = crate::browser::actions::take_snapshot(&channel, tab_id, &BrowserConfig::default()).await;
            let preview: String = snapshot.raw_text.chars().take(2000).collect();
            SubTaskResult { tab_id, sub_task, status: SubTaskStatus::Timeout, extracted_data: preview, error: None }
        }
    }
}

fn strip_markdown_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fence = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_fence.strip_suffix("```").unwrap_or(without_fence).trim().to_string()
}

const DECOMPOSE_SYSTEM_PROMPT: &str = r#"You decompose a user research request into independent per-site sub-tasks.
Respond with ONLY a JSON object: {"isResearch": bool, "reasoning": string, "subTasks": [{"description": string, "url": string, "extractionGoal": string}]}.
Use isResearch=true only when the request genuinely needs multiple independent sources compared against each other."#;

const AGGREGATE_SYSTEM_PROMPT: &str = r#"You synthesize research findings gathered from multiple sources into one direct, well-organized answer for the user.
Cite which source each fact came from when sources disagree."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n{\"isResearch\": true}\n```";
        assert_eq!(strip_markdown_fences(raw), "{\"isResearch\": true}");
    }

    #[test]
    fn strips_bare_code_fence() {
        let raw = "```\n{\"isResearch\": false}\n```";
        assert_eq!(strip_markdown_fences(raw), "{\"isResearch\": false}");
    }

    #[test]
    fn leaves_unfenced_json_untouched() {
        let raw = "{\"isResearch\": false}";
        assert_eq!(strip_markdown_fences(raw), raw);
    }
}
