use std::error::Error;
use std::io::{self, Write};

use taskpilot_core::config::AppConfig;
use taskpilot_core::domain::LlmProvider;
use taskpilot_core::{AutonomousAgent, RunRequest};
use tracing::debug;

use crate::report;

const HELP: &str = "\
Available commands:
  help             Show this help message
  config           Check configuration
  llm <provider>   Switch provider (gemini, openai, anthropic)
  quit | exit      Leave interactive mode

Anything else is run as a goal.";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Help,
    Config,
    Switch(&'a str),
    Quit,
    Goal(&'a str),
    Empty,
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    let lowered = line.to_ascii_lowercase();
    match lowered.as_str() {
        "" => Command::Empty,
        "help" => Command::Help,
        "config" => Command::Config,
        "quit" | "exit" | "q" => Command::Quit,
        _ if lowered.starts_with("llm ") => Command::Switch(line[4..].trim()),
        _ => Command::Goal(line),
    }
}

pub async fn run(
    agent: &AutonomousAgent,
    config: &AppConfig,
    mut provider: LlmProvider,
) -> Result<(), Box<dyn Error>> {
    let available = config.available_providers();
    println!("taskpilot interactive mode");
    println!("Type 'help' for commands, 'quit' to leave.");

    loop {
        print!("\n[{provider}] goal> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            println!("\nGoodbye!");
            return Ok(());
        }

        match parse_command(&line) {
            Command::Empty => continue,
            Command::Help => println!("{HELP}"),
            Command::Config => println!("{}", report::render_config(config)),
            Command::Quit => {
                println!("Goodbye!");
                return Ok(());
            }
            Command::Switch(name) => match name.parse::<LlmProvider>() {
                Ok(requested) if available.contains(&requested) => {
                    provider = requested;
                    println!("Switched to {provider}");
                }
                Ok(requested) => {
                    println!("Provider {requested} is not available");
                    println!("Available: {}", report::provider_list(&available));
                }
                Err(err) => println!("{err}"),
            },
            Command::Goal(goal) => {
                debug!(goal, provider = provider.as_str(), "Running goal from prompt");
                println!("\nExecuting: {goal}");
                let state = agent
                    .run(RunRequest::new(goal).with_provider(provider))
                    .await;
                println!("{}", report::render_summary(&state));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_commands() {
        assert_eq!(parse_command("  HELP \n"), Command::Help);
        assert_eq!(parse_command("config"), Command::Config);
        assert_eq!(parse_command("Exit"), Command::Quit);
        assert_eq!(parse_command("llm OpenAI"), Command::Switch("OpenAI"));
        assert_eq!(parse_command("\n"), Command::Empty);
        assert_eq!(
            parse_command("How many books are there?"),
            Command::Goal("How many books are there?")
        );
    }
}
