//! Interactive REPL
//!
//! A banner, a prompt/read/dispatch loop, and lazy browser setup, driving
//! either the single-tab `AgentLoop` or `ResearchOrchestrator` depending on
//! the input. `Ctrl+D`/`exit` end the session; `AGENT_STOP` cancellation is
//! exposed via `Repl::stop` for cooperative cancellation rather than process
//! exit.
use std::io::{self, Write};
use std::sync::Arc;

use crate::agent::{AgentLoop, AgentRuntime, CancellationFlag, LoopOutcome};
use crate::browser::{ChromiumBackend, DebuggerChannel, TabRegistry};
use crate::contracts::LlmProvider;
use crate::core::{Config, Result};
use crate::llm::OpenAiCompatibleClient;
use crate::research::ResearchOrchestrator;

use super::commands::{handle_command, CommandResult};

/// Lazily-initialized browser handle, shared across runs in one REPL session
struct Browser {
    channel: Arc<DebuggerChannel>,
    registry: Arc<TabRegistry>,
}

pub struct Repl {
    config: Config,
    llm: Arc<dyn LlmProvider>,
    browser: Option<Browser>,
    abort: CancellationFlag,
    debug: bool,
}

impl Repl {
    pub async fn new() -> Result<Self> {
        Self::with_config(Config::load()).await
    }

    pub async fn with_config(config: Config) -> Result<Self> {
        let debug = config.agent.debug;
        let llm = Arc::new(OpenAiCompatibleClient::from_config(&config.llm, debug)) as Arc<dyn LlmProvider>;
        Ok(Self { config, llm, browser: None, abort: CancellationFlag::new(), debug })
    }

    async fn browser(&mut self) -> Result<&Browser> {
        if self.browser.is_none() {
            println!("Launching browser...");
            let backend = Arc::new(ChromiumBackend::launch(&self.config.browser).await?);
            let channel = DebuggerChannel::new(backend.clone());
            let registry = Arc::new(TabRegistry::new(backend));
            self.browser = Some(Browser { channel, registry });
        }
        Ok(self.browser.as_ref().expect("just initialized"))
    }

    pub async fn run(&mut self) -> Result<()> {
        print_banner(&self.config);

        let stdin = io::stdin();
        loop {
            print!("You: ");
            io::stdout().flush().ok();

            let mut line = String::new();
            let bytes_read = stdin.read_line(&mut line).unwrap_or(0);
            if bytes_read == 0 {
                println!("\nGoodbye.");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match handle_command(line, &self.config, self.debug) {
                CommandResult::Exit => {
                    println!("Goodbye.");
                    break;
                }
                CommandResult::Clear => {
                    self.abort = CancellationFlag::new();
                    println!("Transcript cleared.");
                    continue;
                }
                CommandResult::Handled(output) => {
                    println!("{}", output);
                    continue;
                }
                CommandResult::Continue(prompt) => {
                    if let Err(e) = self.dispatch(&prompt).await {
                        eprintln!("Error: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    async fn dispatch(&mut self, prompt: &str) -> Result<()> {
        if let Some(research_prompt) = prompt.strip_prefix("research ") {
            self.run_research(research_prompt.trim()).await
        } else {
            self.run_agent(prompt).await
        }
    }

    /// Non-interactive single-prompt mode, used by `--prompt`
    pub async fn run_once(&mut self, prompt: &str) -> Result<()> {
        self.dispatch(prompt).await
    }

    async fn run_agent(&mut self, prompt: &str) -> Result<()> {
        let llm = self.llm.clone();
        let agent_config = self.config.agent.clone();
        let browser_config = self.config.browser.clone();
        let abort = self.abort.clone();

        let (channel, registry) = {
            let browser = self.browser().await?;
            (browser.channel.clone(), browser.registry.clone())
        };

        let runtime = Arc::new(AgentRuntime::with_shared_abort(abort));
        let mut agent_loop =
            AgentLoop::new_single_tab(llm, channel, registry, runtime, agent_config, browser_config);

        let outcome = agent_loop.run(prompt).await?;
        match outcome {
            LoopOutcome::Cancelled => println!("{}", outcome.text()),
            _ => println!("Edith: {}", outcome.text()),
        }
        Ok(())
    }

    async fn run_research(&mut self, prompt: &str) -> Result<()> {
        let llm = self.llm.clone();
        let research_config = self.config.research.clone();
        let agent_config = self.config.agent.clone();
        let browser_config = self.config.browser.clone();
        let abort = self.abort.clone();

        let (channel, registry) = {
            let browser = self.browser().await?;
            (browser.channel.clone(), browser.registry.clone())
        };

        let orchestrator = ResearchOrchestrator::new(
            llm,
            channel,
            registry,
            research_config,
            agent_config,
            browser_config,
            abort,
        );

        let synthesis = orchestrator.run(prompt, |update| println!("  {}", update)).await?;
        println!("Edith: {}", synthesis);
        Ok(())
    }

    /// Sets the cooperative-cancellation flag for the run in flight (`AGENT_STOP`)
    pub fn stop(&self) {
        self.abort.set();
    }
}

fn print_banner(config: &Config) {
    println!(
        r#"
  _______    _ _ _   _
 |  ____|  | (_) | | |
 | |__   __| |_| |_| |__
 |  __| / _` | | __| '_ \
 | |___| (_| | | |_| | | |
 |______\__,_|_|\__|_| |_|

 Browser automation agent. Type 'help' for commands.
 Model: {}  Endpoint: {}
"#,
        config.llm.model, config.llm.api_base_url
    );
}
