//! Core module - shared infrastructure for the agent core
//!
//! Foundational types, configuration, and error handling used throughout
//! the rest of the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{EdithError, Result};
pub use types::*;
