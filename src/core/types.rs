//! Shared types used across the agent core
//!
//! Transcript messages, tool calls/definitions, and common result wrappers.

use serde::{Deserialize, Serialize};

/// Role of a transcript message's sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A message in the agent loop's transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique id within the transcript
    pub id: u64,
    /// Role of the sender
    pub role: Role,
    /// Content of the message
    pub content: String,
    /// Tool calls made by an assistant message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Id of the tool call this message is a result for (tool-role messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this message (tool-role messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Unix millis timestamp, supplied by the caller (never sampled internally)
    pub timestamp: u64,
}

impl Message {
    /// Build a user message
    pub fn user(id: u64, content: impl Into<String>, timestamp: u64) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
            timestamp,
        }
    }

    /// Build an assistant message, optionally carrying tool calls
    pub fn assistant(
        id: u64,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        timestamp: u64,
    ) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
            tool_name: None,
            timestamp,
        }
    }

    /// Build a tool-result message
    pub fn tool_result(
        id: u64,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            id,
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            timestamp,
        }
    }

    /// Whether this message carries one or more tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// A tool call made by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id assigned by the LLM provider, used to pair with the tool-result message
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Get an integer argument by key
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.arguments.get(key).and_then(|v| v.as_u64())
    }

    /// Get a boolean argument by key
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.arguments.get(key).and_then(|v| v.as_bool())
    }

    /// Require a string argument, producing an agent-observable error string on failure
    pub fn require_string(&self, key: &str) -> std::result::Result<String, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Error: missing required argument '{}'", key))
    }

    /// Require a UID argument, producing an agent-observable error string on failure
    pub fn require_uid(&self, key: &str) -> std::result::Result<u64, String> {
        self.get_u64(key)
            .ok_or_else(|| format!("Error: missing required argument '{}'", key))
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_message_without_calls_has_none() {
        let msg = Message::assistant(1, "done", vec![], 0);
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn assistant_message_with_calls() {
        let call = ToolCall::new("c1", "click", serde_json::json!({"uid": 3}));
        let msg = Message::assistant(1, "", vec![call], 0);
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn tool_call_argument_accessors() {
        let call = ToolCall::new("c1", "type_text", serde_json::json!({"uid": 5, "text": "hi"}));
        assert_eq!(call.get_u64("uid"), Some(5));
        assert_eq!(call.get_string("text").as_deref(), Some("hi"));
        assert!(call.get_string("missing").is_none());
    }
}
