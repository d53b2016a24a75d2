//! The Agent Loop (§4.4): the single-tab reason-observe-act control loop.
//!
//! System-prompt assembly, the zero/non-zero tool-call branch, and a
//! synthesize-on-max-steps fallback drive the nine browser action
//! primitives through the state machine in §4.4.1.

use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use crate::browser::{format_snapshot, DebuggerChannel, Snapshot, TabId, TabRegistry, TabStateUpdate, TabStatus};
use crate::contracts::{GenerateOptions, LlmProvider};
use crate::core::config::{AgentConfig, BrowserConfig};
use crate::core::types::ToolCall;
use crate::core::Result;

use super::catalog::{ToolCatalog, ToolMode, MUTATING_TOOLS};
use super::runtime::AgentRuntime;
use super::transcript::Transcript;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

const NEW_TAB_SENTINEL: &str = "__NEW_TAB__";
const STOP_MARKER: &str = "\u{23F9} Automation stopped by user.";

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Terminal tool invoked, or the LLM produced text without tool calls
    Done(String),
    /// Cooperative cancellation observed at a checkpoint
    Cancelled,
    /// The step budget was exhausted without an explicit terminal call
    StepBudgetExhausted(String),
}

impl LoopOutcome {
    pub fn text(&self) -> &str {
        match self {
            LoopOutcome::Done(s) => s,
            LoopOutcome::Cancelled => STOP_MARKER,
            LoopOutcome::StepBudgetExhausted(s) => s,
        }
    }
}

/// A sink for human-readable progress updates ("Navigating...", "Reading
/// page (N elements)", "Data extracted ✓"), forwarded to whatever drives
/// this loop — the research orchestrator's per-sub-task progress stream,
/// in particular.
type ProgressSink = Box<dyn FnMut(&str) + Send>;

pub struct AgentLoop {
    llm: Arc<dyn LlmProvider>,
    channel: Arc<DebuggerChannel>,
    registry: Arc<TabRegistry>,
    runtime: Arc<AgentRuntime>,
    catalog: ToolCatalog,
    agent_config: AgentConfig,
    browser_config: BrowserConfig,
    max_steps: usize,
    transcript: Transcript,
    active_tab: Option<TabId>,
    last_snapshot: Option<Snapshot>,
    system_prompt: String,
    progress: Option<ProgressSink>,
}

impl AgentLoop {
    /// A single-tab, top-level agent run
    pub fn new_single_tab(
        llm: Arc<dyn LlmProvider>,
        channel: Arc<DebuggerChannel>,
        registry: Arc<TabRegistry>,
        runtime: Arc<AgentRuntime>,
        agent_config: AgentConfig,
        browser_config: BrowserConfig,
    ) -> Self {
        let max_steps = agent_config.max_steps;
        Self {
            llm,
            channel,
            registry,
            runtime,
            catalog: ToolCatalog::for_mode(ToolMode::SingleTab),
            agent_config,
            browser_config,
            max_steps,
            transcript: Transcript::new(0),
            active_tab: None,
            last_snapshot: None,
            system_prompt: single_tab_system_prompt(),
            progress: None,
        }
    }

    /// A research sub-task loop bound to an already-created tab
    pub fn new_sub_task(
        llm: Arc<dyn LlmProvider>,
        channel: Arc<DebuggerChannel>,
        registry: Arc<TabRegistry>,
        runtime: Arc<AgentRuntime>,
        agent_config: AgentConfig,
        browser_config: BrowserConfig,
        tab_id: TabId,
        extraction_goal: &str,
    ) -> Self {
        let max_steps = agent_config.sub_task_max_steps;
        Self {
            llm,
            channel,
            registry,
            runtime,
            catalog: ToolCatalog::for_mode(ToolMode::SubTask),
            agent_config,
            browser_config,
            max_steps,
            transcript: Transcript::new(0),
            active_tab: Some(tab_id),
            last_snapshot: None,
            system_prompt: sub_task_system_prompt(extraction_goal),
            progress: None,
        }
    }

    /// Wires a progress sink into this loop (§4.5 Phase 2(iv), §5). Only
    /// meaningful for sub-task loops driven by the research orchestrator;
    /// single-tab runs have no caller that reads it.
    pub fn with_progress(mut self, sink: impl FnMut(&str) + Send + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    fn emit_progress(&mut self, message: &str) {
        if let Some(sink) = self.progress.as_mut() {
            sink(message);
        }
    }

    /// Drives the loop to completion: one `user` message, then steps until
    /// done, cancelled, or the step budget is exhausted (§4.4.1-4.4.3).
    pub async fn run(&mut self, user_prompt: &str) -> Result<LoopOutcome> {
        self.transcript.push_user(user_prompt, now_millis());

        for step in 0..self.max_steps {
            if let Some(outcome) = self.check_abort().await {
                return Ok(outcome);
            }

            self.transcript.prune();

            let response = self
                .llm
                .call(
                    &self.system_prompt,
                    self.transcript.messages(),
                    self.catalog.definitions(),
                    Some(GenerateOptions { temperature: Some(0.1), max_tokens: None }),
                )
                .await?;

            if response.tool_calls.is_empty() {
                self.transcript.push_assistant(response.content.clone(), vec![], now_millis());
                self.detach_active().await;
                return Ok(LoopOutcome::Done(response.content));
            }

            self.transcript
                .push_assistant(response.content.clone(), response.tool_calls.clone(), now_millis());

            if let Some(outcome) = self.dispatch_tool_calls(&response.tool_calls).await? {
                return Ok(outcome);
            }

            if self.agent_config.debug {
                eprintln!("DEBUG: step {}/{} complete", step + 1, self.max_steps);
            }
        }

        let message = "Max steps reached without completing the task.".to_string();
        self.transcript.push_assistant(message.clone(), vec![], now_millis());
        self.detach_active().await;
        Ok(LoopOutcome::StepBudgetExhausted(message))
    }

    async fn check_abort(&mut self) -> Option<LoopOutcome> {
        if !self.runtime.is_aborted() {
            return None;
        }
        self.transcript.push_assistant(STOP_MARKER, vec![], now_millis());
        self.detach_active().await;
        Some(LoopOutcome::Cancelled)
    }

    async fn detach_active(&mut self) {
        if let Some(tab_id) = self.active_tab.take() {
            let _ = self.channel.detach(tab_id).await;
            let _ = self.registry.detach(tab_id).await;
        }
    }

    /// Dispatches every tool call from one assistant turn, in order.
    /// Returns `Some(outcome)` if a terminal tool or cancellation ended the run.
    async fn dispatch_tool_calls(&mut self, calls: &[ToolCall]) -> Result<Option<LoopOutcome>> {
        for call in calls {
            if self.runtime.is_aborted() {
                self.transcript.push_assistant(STOP_MARKER, vec![], now_millis());
                self.detach_active().await;
                return Ok(Some(LoopOutcome::Cancelled));
            }

            if call.name == self.catalog.terminal_tool_name() {
                let is_sub_task = self.catalog.mode() == ToolMode::SubTask;
                let summary = call
                    .get_string(if is_sub_task { "data" } else { "summary" })
                    .unwrap_or_default();
                if is_sub_task {
                    self.emit_progress("Data extracted \u{2713}");
                }
                self.transcript
                    .push_tool_result(call.id.clone(), call.name.clone(), summary.clone(), now_millis());
                self.detach_active().await;
                return Ok(Some(LoopOutcome::Done(summary)));
            }

            let result = self.execute_one(call).await;
            self.transcript
                .push_tool_result(call.id.clone(), call.name.clone(), result, now_millis());
        }
        Ok(None)
    }

    async fn execute_one(&mut self, call: &ToolCall) -> String {
        use crate::browser::actions;

        if call.name == "take_snapshot" {
            let streak = self.runtime.bump_snapshot_streak();
            return self.take_and_format_snapshot(streak).await;
        }
        self.runtime.reset_snapshot_streak();

        match call.name.as_str() {
            "open_browser" => {
                let Ok(url) = call.require_string("url") else {
                    return "Error: missing required argument 'url'".to_string();
                };
                self.emit_progress("Navigating...");
                let description = call.get_string("taskDescription").unwrap_or_default();
                match self.registry.create_tab(&url, &description).await {
                    Ok(tab_id) => {
                        let _ = self.channel.attach(tab_id).await;
                        let _ = self.registry.attach(tab_id).await;
                        self.active_tab = Some(tab_id);
                        self.runtime.set_active_tab(tab_id).await;
                        self.registry
                            .update_state(tab_id, TabStateUpdate { status: Some(TabStatus::Running), ..Default::default() })
                            .await;
                        format!("Opened tab {} at {}", tab_id, url)
                    }
                    Err(e) => format!("Error: failed to open browser: {}", e),
                }
            }
            "navigate" => {
                let Some(tab_id) = self.active_tab else {
                    return "Error: no active tab. Call open_browser first.".to_string();
                };
                let Ok(url) = call.require_string("url") else {
                    return "Error: missing required argument 'url'".to_string();
                };
                self.emit_progress("Navigating...");
                actions::navigate(&self.channel, tab_id, &url, &self.browser_config).await
            }
            "click" | "type_text" | "select_option" | "hover" | "set_value" => {
                self.execute_uid_action(call).await
            }
            "press_key" => {
                let Some(tab_id) = self.active_tab else {
                    return "Error: no active tab.".to_string();
                };
                let Ok(key) = call.require_string("key") else {
                    return "Error: missing required argument 'key'".to_string();
                };
                let mut result = actions::press_key(&self.channel, tab_id, &key, &self.browser_config).await;
                if let Some(snapshot_text) = self.settle_and_resnapshot("press_key", &result).await {
                    result.push_str("\n\n");
                    result.push_str(&snapshot_text);
                }
                result
            }
            "scroll" => {
                let Some(tab_id) = self.active_tab else {
                    return "Error: no active tab.".to_string();
                };
                let Ok(direction) = call.require_string("direction") else {
                    return "Error: missing required argument 'direction'".to_string();
                };
                let amount = call.get_u64("amount").map(|v| v as i64);
                actions::scroll(&self.channel, tab_id, &direction, amount).await
            }
            "wait_for_network_idle" => {
                let Some(tab_id) = self.active_tab else {
                    return "Error: no active tab.".to_string();
                };
                let mut result = actions::wait_for_network_idle(&self.channel, tab_id, &self.browser_config).await;
                if let Some(snapshot_text) = self.settle_and_resnapshot("wait_for_network_idle", &result).await {
                    result.push_str("\n\n");
                    result.push_str(&snapshot_text);
                }
                result
            }
            other => format!("Error: unknown tool '{}'", other),
        }
    }

    async fn execute_uid_action(&mut self, call: &ToolCall) -> String {
        use crate::browser::actions;

        let Some(tab_id) = self.active_tab else {
            return "Error: no active tab. Call open_browser first.".to_string();
        };
        let Some(snapshot) = &self.last_snapshot else {
            return "Error: no snapshot available. Call take_snapshot first.".to_string();
        };
        let Ok(uid) = call.require_uid("uid") else {
            return "Error: missing required argument 'uid'".to_string();
        };

        let mut result = match call.name.as_str() {
            "click" => actions::click(&self.channel, tab_id, uid, snapshot).await,
            "type_text" => {
                let Ok(text) = call.require_string("text") else {
                    return "Error: missing required argument 'text'".to_string();
                };
                actions::type_text(&self.channel, tab_id, &text, uid, snapshot).await
            }
            "select_option" => {
                let Ok(value) = call.require_string("value") else {
                    return "Error: missing required argument 'value'".to_string();
                };
                actions::select_option(&self.channel, tab_id, uid, &value, snapshot).await
            }
            "hover" => actions::hover(&self.channel, tab_id, uid, snapshot).await,
            "set_value" => {
                let Ok(value) = call.require_string("value") else {
                    return "Error: missing required argument 'value'".to_string();
                };
                actions::set_value(&self.channel, tab_id, uid, &value, snapshot).await
            }
            _ => unreachable!("execute_uid_action only called for uid-bound tools"),
        };

        if result.contains(NEW_TAB_SENTINEL) {
            self.follow_new_tab(&result).await;
        }

        if let Some(snapshot_text) = self.settle_and_resnapshot(&call.name, &result).await {
            result.push_str("\n\n");
            result.push_str(&snapshot_text);
        }
        result
    }

    async fn follow_new_tab(&mut self, result: &str) {
        if let Some(idx) = result.find(NEW_TAB_SENTINEL) {
            let tail = &result[idx + NEW_TAB_SENTINEL.len() + 1..];
            if let Ok(new_id) = tail.trim().parse::<TabId>() {
                self.active_tab = Some(new_id);
                self.runtime.set_active_tab(new_id).await;
            }
        }
    }

    /// After mutating tools: sleep a tool-specific settle delay, re-snapshot,
    /// and splice the formatted text onto the tool-result in `execute_one`'s
    /// caller via the transcript entry (§4.4.2 step 5c).
    async fn settle_and_resnapshot(&mut self, tool_name: &str, result: &str) -> Option<String> {
        if !MUTATING_TOOLS.contains(&tool_name) {
            return None;
        }
        let Some(tab_id) = self.active_tab else { return None };

        let delay_ms = if tool_name == "press_key" {
            if result.contains("navigated") { 1500 } else { 300 }
        } else {
            800
        };
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;

        let snapshot = crate::browser::actions::take_snapshot(&self.channel, tab_id, &self.browser_config).await;
        let formatted = format_snapshot(&snapshot);
        self.last_snapshot = Some(snapshot);
        Some(formatted)
    }

    async fn take_and_format_snapshot(&mut self, streak: usize) -> String {
        let Some(tab_id) = self.active_tab else {
            return "Error: no active tab. Call open_browser first.".to_string();
        };
        let snapshot = crate::browser::actions::take_snapshot(&self.channel, tab_id, &self.browser_config).await;
        let element_count = snapshot.elements.len();
        let mut formatted = format_snapshot(&snapshot);
        self.last_snapshot = Some(snapshot);
        self.emit_progress(&format!("Reading page ({} elements)", element_count));

        if streak >= self.agent_config.snapshot_loop_threshold {
            formatted.push_str(
                "\n\u{26A0} You have taken several snapshots in a row without acting. Act on the page or call the terminal tool if the task is complete.",
            );
        }
        formatted
    }
}

fn single_tab_system_prompt() -> String {
    r#"You are a browser-automation agent. You observe a page through structured snapshots, not screenshots, and act on it with low-level tools.

## Workflow
1. `open_browser` a URL, then `take_snapshot` to see interactive elements.
2. Use the element UIDs from the latest snapshot with `click`, `type_text`, `select_option`, `hover`, or `set_value`.
3. After a mutating action, the tool result already includes a fresh snapshot — read it before your next move.
4. Call `task_complete` with a summary once the goal is achieved.

## Rules
- Only use UIDs that appear in the most recent snapshot. If a click reports the UID was not found, take a new snapshot.
- A click result containing `__NEW_TAB__:<id>` means a new tab opened and is now active; your next snapshot will be of that tab.
- Do not call `task_complete` until the goal is actually achieved."#
        .to_string()
}

fn sub_task_system_prompt(extraction_goal: &str) -> String {
    format!(
        r#"You are a browser-automation sub-agent operating one tab as part of a larger research task.

## Goal
{}

## Workflow
Use `take_snapshot`, `click`, `type_text`, `select_option`, `hover`, `set_value`, `scroll`, `navigate`, `press_key`, and `wait_for_network_idle` to reach the goal, then call `extract_data` with the extracted text.

## Rules
- Only use UIDs from the most recent snapshot.
- Call `extract_data` as soon as you have what you need — do not over-explore."#,
        extraction_goal
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::backend::MockBackend;
    use crate::contracts::{FinishReason, LlmResponse};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    struct ScriptedLlm {
        responses: StdMutex<Vec<LlmResponse>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn call(
            &self,
            _system_prompt: &str,
            _messages: &[crate::core::types::Message],
            _tools: &[crate::core::types::ToolDefinition],
            _options: Option<GenerateOptions>,
        ) -> Result<LlmResponse> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let mut guard = self.responses.lock().unwrap();
            if guard.is_empty() {
                return Ok(LlmResponse {
                    content: "done".into(),
                    tool_calls: vec![],
                    finish_reason: FinishReason::Stop,
                });
            }
            Ok(guard.remove(0))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn harness(responses: Vec<LlmResponse>) -> (AgentLoop, Arc<AgentRuntime>) {
        let backend = Arc::new(MockBackend::new());
        let channel = DebuggerChannel::new(backend);
        let registry = Arc::new(TabRegistry::new(Arc::new(MockBackend::new())));
        let runtime = Arc::new(AgentRuntime::new());
        let llm = Arc::new(ScriptedLlm { responses: StdMutex::new(responses), calls: AtomicUsize::new(0) });
        let agent_loop = AgentLoop::new_single_tab(
            llm,
            channel,
            registry,
            runtime.clone(),
            AgentConfig { max_steps: 5, ..Default::default() },
            BrowserConfig::default(),
        );
        (agent_loop, runtime)
    }

    #[tokio::test]
    async fn zero_tool_calls_transitions_to_done() {
        let (mut agent_loop, _runtime) = harness(vec![LlmResponse {
            content: "I already finished.".into(),
            tool_calls: vec![],
            finish_reason: FinishReason::Stop,
        }]);
        let outcome = agent_loop.run("do nothing").await.unwrap();
        assert_eq!(outcome, LoopOutcome::Done("I already finished.".into()));
    }

    #[tokio::test]
    async fn aborted_before_first_step_yields_cancelled() {
        let (mut agent_loop, runtime) = harness(vec![]);
        runtime.abort();
        let outcome = agent_loop.run("anything").await.unwrap();
        assert_eq!(outcome, LoopOutcome::Cancelled);
    }

    #[tokio::test]
    async fn terminal_tool_call_ends_the_run() {
        let call = ToolCall::new("c1", "task_complete", json!({"summary": "Finished the job"}));
        let (mut agent_loop, _runtime) = harness(vec![LlmResponse {
            content: String::new(),
            tool_calls: vec![call],
            finish_reason: FinishReason::ToolCalls,
        }]);
        let outcome = agent_loop.run("do the job").await.unwrap();
        assert_eq!(outcome, LoopOutcome::Done("Finished the job".into()));
    }

    #[tokio::test]
    async fn click_without_snapshot_is_an_observable_error_not_a_panic() {
        let open_call = ToolCall::new("c0", "open_browser", json!({"url": "example.com"}));
        let call = ToolCall::new("c1", "click", json!({"uid": 3}));
        let done_call = ToolCall::new("c2", "task_complete", json!({"summary": "ok"}));
        let (mut agent_loop, _runtime) = harness(vec![
            LlmResponse { content: String::new(), tool_calls: vec![open_call], finish_reason: FinishReason::ToolCalls },
            LlmResponse { content: String::new(), tool_calls: vec![call], finish_reason: FinishReason::ToolCalls },
            LlmResponse { content: String::new(), tool_calls: vec![done_call], finish_reason: FinishReason::ToolCalls },
        ]);
        let outcome = agent_loop.run("click something").await.unwrap();
        assert_eq!(outcome, LoopOutcome::Done("ok".into()));
        let transcript_text: String = agent_loop
            .transcript()
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(transcript_text.contains("no snapshot available"));
    }

    #[tokio::test]
    async fn step_budget_exhaustion_produces_graceful_message() {
        let snapshot_call = ToolCall::new("c1", "take_snapshot", json!({}));
        let responses = (0..10)
            .map(|_| LlmResponse {
                content: String::new(),
                tool_calls: vec![snapshot_call.clone()],
                finish_reason: FinishReason::ToolCalls,
            })
            .collect();
        let (mut agent_loop, _runtime) = harness(responses);
        let outcome = agent_loop.run("loop forever").await.unwrap();
        assert!(matches!(outcome, LoopOutcome::StepBudgetExhausted(_)));
    }
}
