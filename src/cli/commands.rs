//! CLI commands
//!
//! Special commands recognized by the REPL before a line is treated as an
//! agent prompt.

use crate::core::Config;

/// Result of parsing one line of REPL input
pub enum CommandResult {
    /// Not a command — run it as an agent prompt
    Continue(String),
    /// A command was handled; print this output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Clear the current transcript
    Clear,
}

/// Parse and handle a REPL command line
pub fn handle_command(input: &str, config: &Config, debug: bool) -> CommandResult {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();

    match cmd.as_str() {
        "exit" | "quit" | "q" => CommandResult::Exit,
        "clear" | "reset" => CommandResult::Clear,
        "help" | "?" => CommandResult::Handled(help_text()),
        "status" => CommandResult::Handled(format!(
            "Edith Status:\n\
             ─────────────────────────────\n\
             Model:      {}\n\
             Endpoint:   {}\n\
             Headless:   {}\n\
             Max steps:  {}\n\
             Debug:      {}",
            config.llm.model,
            config.llm.api_base_url,
            config.browser.headless,
            config.agent.max_steps,
            if debug { "on" } else { "off" }
        )),
        _ => {
            if input.starts_with('/') {
                CommandResult::Handled(format!("Unknown command: {}. Type 'help' for available commands.", cmd))
            } else {
                CommandResult::Continue(input.to_string())
            }
        }
    }
}

fn help_text() -> String {
    r#"Edith Commands:
─────────────────────────────────────────────
  help, ?            Show this help message
  exit, quit, q      Exit Edith
  clear, reset       Clear the conversation transcript
  status             Show current configuration

  research <prompt>  Run the Research Orchestrator instead of the single-tab agent
  <anything else>    Run the single-tab browser agent

Keyboard Shortcuts:
  Ctrl+C             Cancel the current run (AGENT_STOP)
  Ctrl+D             Exit Edith
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_aliases_all_exit() {
        let config = Config::default();
        for word in ["exit", "quit", "q"] {
            assert!(matches!(handle_command(word, &config, false), CommandResult::Exit));
        }
    }

    #[test]
    fn unknown_slash_command_is_handled_not_continued() {
        let config = Config::default();
        match handle_command("/frobnicate", &config, false) {
            CommandResult::Handled(msg) => assert!(msg.contains("Unknown command")),
            _ => panic!("expected Handled"),
        }
    }

    #[test]
    fn plain_text_continues_as_a_prompt() {
        let config = Config::default();
        match handle_command("search youtube for rust tutorials", &config, false) {
            CommandResult::Continue(text) => assert_eq!(text, "search youtube for rust tutorials"),
            _ => panic!("expected Continue"),
        }
    }
}
