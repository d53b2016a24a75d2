//! Edith: an LLM-driven browser automation agent core, plus a research
//! orchestrator for parallel multi-source tasks.
//!
//! This crate implements the core only: a reason-observe-act agent loop
//! driving a browser through a narrow `DebuggerBackend` contract, a research
//! orchestrator that fans a prompt out across parallel tabs, and the typed
//! inbound/outbound wire shapes a host application drives it through. The
//! chat UI, conversation persistence, and scheduler that would wrap this are
//! out of scope and represented only by the contracts in [`contracts`].

pub mod agent;
pub mod browser;
pub mod cli;
pub mod contracts;
pub mod core;
pub mod interfaces;
pub mod llm;
pub mod research;

pub use agent::{AgentLoop, AgentRuntime, CancellationFlag, LoopOutcome};
pub use cli::Repl;
pub use core::{Config, EdithError, Result};
pub use interfaces::{InboundCommand, OutboundEvent};
pub use research::ResearchOrchestrator;
