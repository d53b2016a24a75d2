//! Edith - LLM-driven browser automation agent
//!
//! Main entry point for the CLI application.

use clap::Parser;
use edith_agent::{Config, Repl};

/// Edith - LLM-driven browser automation agent
#[derive(Parser, Debug)]
#[command(name = "edith")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// LLM model id (overrides config/env)
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// LLM endpoint base URL (overrides config/env)
    #[arg(long)]
    base_url: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Run in headed browser mode (visible window)
    #[arg(long)]
    headed: bool,

    /// Single prompt mode (non-interactive); prefix with "research " to use the orchestrator
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load();

    if let Some(model) = args.model {
        config.llm.model = model;
    }
    if let Some(base_url) = args.base_url {
        config.llm.api_base_url = base_url;
    }
    if args.debug {
        config.agent.debug = true;
    }
    if args.headed {
        config.browser.headless = false;
    }

    let mut repl = Repl::with_config(config).await?;

    if let Some(prompt) = args.prompt {
        repl.run_once(&prompt).await?;
        return Ok(());
    }

    repl.run().await?;

    Ok(())
}
