//! Configuration management for the agent core
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/edith-agent/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{EdithError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Agent loop behavior
    pub agent: AgentConfig,
    /// Research orchestrator behavior
    pub research: ResearchConfig,
    /// Browser/debugger behavior
    pub browser: BrowserConfig,
}

/// LLM provider configuration (the opaque `callLLM` contract's settings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat-completions endpoint
    pub api_base_url: String,
    /// API key, if the endpoint requires one
    pub api_key: Option<String>,
    /// Model id used for the agent loop and sub-task loops
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Single-tab agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Step budget for a single-tab agent run (spec default: 30)
    pub max_steps: usize,
    /// Step budget for a research sub-task (spec default: 20)
    pub sub_task_max_steps: usize,
    /// Number of recent tool-exchange rounds retained by transcript pruning (spec default: 6)
    pub prune_keep_rounds: usize,
    /// Consecutive take_snapshot calls before the nudge heuristic fires (spec default: 3)
    pub snapshot_loop_threshold: usize,
    /// Whether to print DEBUG lines to stderr
    pub debug: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            sub_task_max_steps: 20,
            prune_keep_rounds: 6,
            snapshot_loop_threshold: 3,
            debug: env::var("EDITH_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Research orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum number of parallel sub-tasks (spec default: 5)
    pub max_tabs: usize,
    /// Wall-clock timeout for a sub-task in seconds (spec default: 90)
    pub sub_task_timeout_secs: u64,
    /// Settle delay after opening a tab before dispatching its sub-task, in ms
    pub initial_settle_ms: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_tabs: 5,
            sub_task_timeout_secs: 90,
            initial_settle_ms: 2000,
        }
    }
}

/// Browser/debugger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Whether to run the underlying browser headless
    pub headless: bool,
    /// Default viewport width
    pub viewport_width: u32,
    /// Default viewport height
    pub viewport_height: u32,
    /// `waitForLoad` timeout in ms (spec: 15000)
    pub load_timeout_ms: u64,
    /// `waitForDocReady` timeout in ms (spec: 3000, tolerant)
    pub doc_ready_timeout_ms: u64,
    /// `waitForNavigation` timeout after Enter, in ms (spec: 3000)
    pub navigation_timeout_ms: u64,
    /// `waitForNetworkIdle` timeout in ms (spec: 5000)
    pub network_idle_timeout_ms: u64,
    /// Idle threshold for network idle detection in ms (spec: 500)
    pub network_idle_threshold_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: env::var("EDITH_HEADLESS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            viewport_width: 1280,
            viewport_height: 800,
            load_timeout_ms: 15_000,
            doc_ready_timeout_ms: 3_000,
            navigation_timeout_ms: 3_000,
            network_idle_timeout_ms: 5_000,
            network_idle_threshold_ms: 500,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: env::var("EDITH_LLM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            api_key: env::var("EDITH_LLM_API_KEY").ok(),
            model: env::var("EDITH_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout_secs: 120,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            agent: AgentConfig::default(),
            research: ResearchConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edith-agent")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults.
    /// Priority: CLI args (applied by the caller) > env vars > config file > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(EdithError::config("config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| EdithError::config(format!("failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| EdithError::config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| EdithError::config(format!("failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| EdithError::config(format!("failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| EdithError::config(format!("failed to write config: {}", e)))?;

        Ok(())
    }

    /// Save configuration and return the path it was written to
    pub fn save_and_get_path(&self) -> Result<PathBuf> {
        self.save()?;
        Ok(Self::config_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.max_steps, 30);
        assert_eq!(config.agent.sub_task_max_steps, 20);
        assert_eq!(config.agent.prune_keep_rounds, 6);
        assert_eq!(config.research.max_tabs, 5);
        assert_eq!(config.research.sub_task_timeout_secs, 90);
        assert_eq!(config.browser.load_timeout_ms, 15_000);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.max_steps, config.agent.max_steps);
    }

    #[test]
    fn config_dir_is_namespaced() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("edith-agent"));
    }
}
