//! An OpenAI-compatible-chat-completions `LlmProvider` (§6)
//!
//! Adapts any provider speaking an OpenAI-compatible
//! chat-completion-with-tools shape: `choices[0].message.tool_calls` +
//! `finish_reason`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::contracts::{FinishReason, GenerateOptions, LlmProvider, LlmResponse};
use crate::core::config::LlmConfig;
use crate::core::{EdithError, Message, Result, Role, ToolCall, ToolDefinition};

/// Client for any OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    debug: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    /// Arguments are transmitted as a JSON-encoded string per the
    /// OpenAI chat-completions wire format
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig, debug: bool) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            debug,
        }
    }

    fn debug_print(&self, label: &str, content: &str) {
        if self.debug {
            let truncated: String = content.chars().take(500).collect();
            eprintln!("DEBUG {}: {}", label, truncated);
        }
    }

    fn to_api_message(msg: &Message) -> ChatMessage {
        ChatMessage {
            role: msg.role.to_string(),
            content: Some(msg.content.clone()),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: tc.id.clone(),
                        call_type: "function".to_string(),
                        function: ApiFunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn to_llm_response(response: ChatCompletionResponse) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EdithError::llm("empty choices array in chat completion response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::Object(Default::default()));
                ToolCall::new(tc.id, tc.function.name, arguments)
            })
            .collect::<Vec<_>>();

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => FinishReason::ToolCalls,
            Some("length") => FinishReason::Length,
            Some("stop") => FinishReason::Stop,
            _ if !tool_calls.is_empty() => FinishReason::ToolCalls,
            _ => FinishReason::Other,
        };

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleClient {
    async fn call(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LlmResponse> {
        let mut api_messages = vec![ChatMessage {
            role: "system".to_string(),
            content: Some(system_prompt.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }];
        api_messages.extend(messages.iter().map(Self::to_api_message));

        let request = ChatRequest {
            model: &self.model,
            messages: api_messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
            temperature: options.as_ref().and_then(|o| o.temperature),
            max_tokens: options.as_ref().and_then(|o| o.max_tokens),
            stream: false,
        };

        let request_json = serde_json::to_string(&request)?;
        self.debug_print("Request", &request_json);

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_connect() {
                EdithError::llm(format!("cannot connect to {}: {}", self.base_url, e))
            } else {
                EdithError::from(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EdithError::llm(format!("chat completion failed ({}): {}", status, body)));
        }

        let response_text = response.text().await?;
        self.debug_print("Response", &response_text);

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| EdithError::llm(format!("failed to parse chat completion response: {}", e)))?;

        Self::to_llm_response(parsed)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
