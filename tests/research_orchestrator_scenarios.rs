//! End-to-end Research Orchestrator scenarios (§4.5, §8), driven against
//! `MockBackend` and a scripted `LlmProvider`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;

use edith_agent::agent::CancellationFlag;
use edith_agent::browser::backend::MockBackend;
use edith_agent::browser::{DebuggerChannel, TabRegistry};
use edith_agent::contracts::{FinishReason, GenerateOptions, LlmProvider, LlmResponse};
use edith_agent::core::types::{Message, ToolDefinition};
use edith_agent::core::{Config, Result};
use edith_agent::ResearchOrchestrator;

/// Returns a scripted decomposition response, then "done" text for every
/// sub-task agent loop call, then a scripted aggregate response.
struct ScriptedLlm {
    decompose_reply: String,
    aggregate_reply: String,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn call(
        &self,
        system_prompt: &str,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LlmResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            return Ok(LlmResponse {
                content: self.decompose_reply.clone(),
                tool_calls: vec![],
                finish_reason: FinishReason::Stop,
            });
        }
        if system_prompt.contains("synthesize") || system_prompt.to_lowercase().contains("synthesiz") {
            return Ok(LlmResponse {
                content: self.aggregate_reply.clone(),
                tool_calls: vec![],
                finish_reason: FinishReason::Stop,
            });
        }
        // every sub-task agent loop call: finish immediately with no tool calls
        Ok(LlmResponse { content: "Extracted page data.".into(), tool_calls: vec![], finish_reason: FinishReason::Stop })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn harness(decompose_reply: &str, aggregate_reply: &str) -> ResearchOrchestrator {
    let channel = DebuggerChannel::new(Arc::new(MockBackend::new()));
    let registry = Arc::new(TabRegistry::new(Arc::new(MockBackend::new())));
    let llm = Arc::new(ScriptedLlm {
        decompose_reply: decompose_reply.to_string(),
        aggregate_reply: aggregate_reply.to_string(),
        calls: AtomicUsize::new(0),
    });
    let config = Config::default();

    ResearchOrchestrator::new(
        llm,
        channel,
        registry,
        config.research,
        config.agent,
        config.browser,
        CancellationFlag::new(),
    )
}

/// §8 scenario: fewer than two sub-tasks means it isn't genuinely a
/// research task, and the orchestrator should fall back without opening tabs.
#[tokio::test]
async fn single_source_decomposition_falls_back_to_single_tab_suggestion() {
    let orchestrator = harness(
        r#"{"isResearch": false, "reasoning": "only one source needed", "subTasks": []}"#,
        "unused",
    );

    let result = orchestrator.run("what is the capital of France?", |_| {}).await.unwrap();
    assert!(result.to_lowercase().contains("single browser agent") || result.to_lowercase().contains("research"));
}

/// §8 scenario: unparseable decomposition output must fail safe into the
/// single-tab fallback rather than propagating a parse error.
#[tokio::test]
async fn unparseable_decomposition_response_falls_back_safely() {
    let orchestrator = harness("not json at all", "unused");

    let result = orchestrator.run("compare three frameworks", |_| {}).await;
    assert!(result.is_ok());
}

/// §8 scenario: three independent sub-tasks run concurrently and get
/// synthesized into one final answer.
#[tokio::test]
async fn three_source_research_runs_concurrently_and_synthesizes() {
    let decompose = r#"{
        "isResearch": true,
        "reasoning": "three independent sources to compare",
        "subTasks": [
            {"description": "Check site A", "url": "https://a.example.com", "extractionGoal": "pricing"},
            {"description": "Check site B", "url": "https://b.example.com", "extractionGoal": "pricing"},
            {"description": "Check site C", "url": "https://c.example.com", "extractionGoal": "pricing"}
        ]
    }"#;

    let orchestrator = harness(decompose, "Here is the synthesized pricing comparison across all three sites.");

    let mut progress_updates = Vec::new();
    let result = orchestrator
        .run("compare pricing across sites A, B, and C", |update| progress_updates.push(update.to_string()))
        .await
        .unwrap();

    assert_eq!(result, "Here is the synthesized pricing comparison across all three sites.");
    assert!(progress_updates.iter().any(|u| u.contains("Opening")));
}
