//! The opaque `callLLM` contract (§6)
//!
//! The core never picks a provider or speaks HTTP directly to one; it calls
//! through this trait. `crate::llm::OpenAiCompatibleClient` is the one
//! concrete implementation this crate ships, targeting the OpenAI-style
//! `choices[0].message.tool_calls` + `finish_reason` response shape that
//! any OpenAI-compatible chat-completions endpoint exposes.

use async_trait::async_trait;

use crate::core::{Message, Result, ToolCall, ToolDefinition};

/// Response from an LLM provider's `callLLM` invocation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response
    pub content: String,
    /// Tool calls the model wants to make, if any
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
}

/// Why the LLM stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Produced a plain-text final answer
    Stop,
    /// Produced one or more tool calls
    ToolCalls,
    /// Hit the provider's own length limit
    Length,
    /// Anything else the provider reports
    Other,
}

/// Options influencing a single generation call
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// The narrow `callLLM(settings, systemPrompt, messages, tools) -> {content, toolCalls, finishReason}` contract
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Invoke the model with a system prompt, transcript, and tool catalog
    async fn call(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LlmResponse>;

    /// Provider name, for debug logging
    fn name(&self) -> &str;
}
