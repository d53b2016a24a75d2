//! The Agent Loop subsystem (§4.4): transcript pruning, tool catalog,
//! process-scoped runtime state, and the state machine itself.

pub mod agent_loop;
pub mod catalog;
pub mod runtime;
pub mod transcript;

pub use agent_loop::{AgentLoop, LoopOutcome};
pub use catalog::{ToolCatalog, ToolMode};
pub use runtime::{AgentRuntime, CancellationFlag};
pub use transcript::Transcript;
