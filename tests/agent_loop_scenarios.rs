//! End-to-end Agent Loop scenarios, driven against `MockBackend` + a
//! scripted `LlmProvider` so no live browser or LLM endpoint is required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::json;

use edith_agent::agent::{AgentLoop, AgentRuntime, LoopOutcome};
use edith_agent::browser::backend::MockBackend;
use edith_agent::browser::{DebuggerChannel, TabRegistry};
use edith_agent::contracts::{FinishReason, GenerateOptions, LlmProvider, LlmResponse};
use edith_agent::core::types::{Message, ToolCall, ToolDefinition};
use edith_agent::core::{Config, Result};

struct ScriptedLlm {
    responses: StdMutex<Vec<LlmResponse>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(responses: Vec<LlmResponse>) -> Self {
        Self { responses: StdMutex::new(responses), calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn call(
        &self,
        _system_prompt: &str,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.responses.lock().unwrap();
        if guard.is_empty() {
            return Ok(LlmResponse { content: "done".into(), tool_calls: vec![], finish_reason: FinishReason::Stop });
        }
        Ok(guard.remove(0))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn text_response(text: &str) -> LlmResponse {
    LlmResponse { content: text.into(), tool_calls: vec![], finish_reason: FinishReason::Stop }
}

fn tool_call_response(call: ToolCall) -> LlmResponse {
    LlmResponse { content: String::new(), tool_calls: vec![call], finish_reason: FinishReason::ToolCalls }
}

fn harness(responses: Vec<LlmResponse>) -> (AgentLoop, Arc<AgentRuntime>) {
    let channel = DebuggerChannel::new(Arc::new(MockBackend::new()));
    let registry = Arc::new(TabRegistry::new(Arc::new(MockBackend::new())));
    let runtime = Arc::new(AgentRuntime::new());
    let llm = Arc::new(ScriptedLlm::new(responses));
    let config = Config::default();
    let agent_loop = AgentLoop::new_single_tab(
        llm,
        channel,
        registry,
        runtime.clone(),
        config.agent,
        config.browser,
    );
    (agent_loop, runtime)
}

/// §8 scenario: search, read the results, and finish without ever hitting the step cap.
#[tokio::test]
async fn search_then_summarize_completes_within_a_handful_of_steps() {
    let open_call = ToolCall::new("c0", "open_browser", json!({"url": "https://youtube.com"}));
    let snapshot_call = ToolCall::new("c1", "take_snapshot", json!({}));
    let type_call = ToolCall::new("c2", "type_text", json!({"uid": 4, "text": "rust tutorials"}));
    let done_call = ToolCall::new("c3", "task_complete", json!({"summary": "Found several Rust tutorials."}));

    let (mut agent_loop, _runtime) = harness(vec![
        tool_call_response(open_call),
        tool_call_response(snapshot_call),
        tool_call_response(type_call),
        tool_call_response(done_call),
    ]);

    let outcome = agent_loop.run("search youtube for rust tutorials").await.unwrap();
    assert_eq!(outcome, LoopOutcome::Done("Found several Rust tutorials.".into()));
}

/// §8 boundary: a stale uid from before a navigation must surface as a
/// transcript error the LLM can recover from, never a panic.
#[tokio::test]
async fn stale_uid_after_navigation_is_recoverable() {
    let open_call = ToolCall::new("c0", "open_browser", json!({"url": "https://example.com"}));
    let snapshot_call = ToolCall::new("c1", "take_snapshot", json!({}));
    let navigate_call = ToolCall::new("c2", "navigate", json!({"url": "https://example.com/other"}));
    let stale_click = ToolCall::new("c3", "click", json!({"uid": 99}));
    let recovered_snapshot = ToolCall::new("c4", "take_snapshot", json!({}));
    let done_call = ToolCall::new("c5", "task_complete", json!({"summary": "Recovered and finished."}));

    let (mut agent_loop, _runtime) = harness(vec![
        tool_call_response(open_call),
        tool_call_response(snapshot_call),
        tool_call_response(navigate_call),
        tool_call_response(stale_click),
        tool_call_response(recovered_snapshot),
        tool_call_response(done_call),
    ]);

    let outcome = agent_loop.run("click the stale element").await.unwrap();
    assert_eq!(outcome, LoopOutcome::Done("Recovered and finished.".into()));
}

/// §8 scenario: an abort observed mid-run must short-circuit before the next
/// LLM call, not merely at the top of the loop.
#[tokio::test]
async fn cancellation_mid_run_stops_before_further_tool_dispatch() {
    let open_call = ToolCall::new("c0", "open_browser", json!({"url": "https://example.com"}));
    let (mut agent_loop, runtime) = harness(vec![tool_call_response(open_call), text_response("should never run")]);

    runtime.abort();
    let outcome = agent_loop.run("do something long").await.unwrap();
    assert_eq!(outcome, LoopOutcome::Cancelled);
}

/// A click that never produces a `TargetCreated` event should complete
/// normally, leaving the active tab unchanged.
#[tokio::test]
async fn click_without_a_new_tab_event_keeps_the_active_tab() {
    let open_call = ToolCall::new("c0", "open_browser", json!({"url": "https://example.com"}));
    let snapshot_call = ToolCall::new("c1", "take_snapshot", json!({}));
    let click_call = ToolCall::new("c2", "click", json!({"uid": 7}));
    let done_call = ToolCall::new("c3", "task_complete", json!({"summary": "Clicked and finished."}));

    let (mut agent_loop, _runtime) = harness(vec![
        tool_call_response(open_call),
        tool_call_response(snapshot_call),
        tool_call_response(click_call),
        tool_call_response(done_call),
    ]);

    let outcome = agent_loop.run("click a link").await.unwrap();
    assert_eq!(outcome, LoopOutcome::Done("Clicked and finished.".into()));
}
