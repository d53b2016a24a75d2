//! Command-line interface: REPL and command parsing

pub mod commands;
pub mod repl;

pub use repl::Repl;
