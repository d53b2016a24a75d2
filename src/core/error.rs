//! Custom error types for the agent core
//!
//! Provides a unified error handling system across all modules. Errors that
//! the LLM can observe and react to are never constructed here — those are
//! rendered as plain strings at the tool boundary (see `browser::actions`).
//! This type is reserved for failures that abort a run.

use thiserror::Error;

/// Main error type for agent core operations
#[derive(Error, Debug)]
pub enum EdithError {
    /// No API key / model configured
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    /// A debugger command was rejected, or the tab closed mid-flight
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The debugger channel was asked to operate on a tab it has not attached
    #[error("tab {0} is not attached")]
    NotAttached(u64),

    /// LLM transport/provider error, not recoverable by the agent loop
    #[error("LLM transport error: {0}")]
    LlmTransport(String),

    /// Configuration errors (file, parse)
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for agent core operations
pub type Result<T> = std::result::Result<T, EdithError>;

impl EdithError {
    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an LLM transport error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::LlmTransport(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }
}
