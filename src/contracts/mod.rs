//! Narrow external contracts (§6)
//!
//! These traits are the seams between the agent core and collaborators kept
//! deliberately out of scope: LLM transport/provider choice,
//! settings/conversation persistence, and the host's raw browser debugger
//! API. The core depends only on these traits; production backends for the
//! chat UI, scheduler, and storage system live outside this crate.

mod debugger_backend;
mod llm_provider;
mod storage;

pub use debugger_backend::{DebuggerBackend, DebuggerEvent};
pub use llm_provider::{FinishReason, GenerateOptions, LlmProvider, LlmResponse};
pub use storage::{Conversation, ConversationStore, InMemoryConversationStore, Schedule, Settings};
