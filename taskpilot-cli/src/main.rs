mod interactive;
mod report;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use taskpilot_core::config::AppConfig;
use taskpilot_core::domain::LlmProvider;
use taskpilot_core::{AutonomousAgent, RunRequest};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "taskpilot",
    version,
    about = "Autonomous task agent that plans with an LLM and acts through a JSON-RPC tool server"
)]
struct Cli {
    /// Goal for the agent to accomplish
    goal: Option<String>,
    /// Additional message or context for the goal
    #[arg(short, long)]
    message: Option<String>,
    /// LLM provider to use (gemini, openai, anthropic)
    #[arg(long)]
    llm: Option<LlmProvider>,
    /// Print an update after every node instead of a final summary
    #[arg(short, long)]
    streaming: bool,
    /// Emit JSON instead of the text report
    #[arg(long)]
    json: bool,
    /// Path to agent.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Silence logging
    #[arg(short, long)]
    quiet: bool,
    /// Report provider and tool server configuration, then exit
    #[arg(long)]
    check_config: bool,
    /// Read goals from the terminal until `quit`
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum ProviderChoice {
    Selected(LlmProvider),
    Fallback {
        requested: LlmProvider,
        used: LlmProvider,
    },
    Unavailable,
}

/// Keeps the requested provider when it has credentials, otherwise falls
/// back to the first available one.
fn choose_provider(requested: LlmProvider, available: &[LlmProvider]) -> ProviderChoice {
    if available.contains(&requested) {
        return ProviderChoice::Selected(requested);
    }
    match available.first() {
        Some(&used) => ProviderChoice::Fallback { requested, used },
        None => ProviderChoice::Unavailable,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.quiet || cli.json);
    debug!(?cli, "CLI arguments parsed");

    let config = AppConfig::load(cli.config.as_deref())?;
    match &cli.config {
        Some(path) => info!(path = %path.display(), "Loaded configuration from file"),
        None => info!("Loaded configuration using default path or defaults"),
    }

    if cli.check_config {
        println!("{}", report::render_config(&config));
        if config.available_providers().is_empty() {
            println!("\nNo LLM providers are available. Configure at least one API key.");
            return Ok(ExitCode::FAILURE);
        }
        println!("\nConfiguration check completed.");
        return Ok(ExitCode::SUCCESS);
    }

    let available = config.available_providers();
    let requested = cli.llm.unwrap_or(config.default_provider);
    let provider = match choose_provider(requested, &available) {
        ProviderChoice::Selected(provider) => provider,
        ProviderChoice::Fallback { requested, used } => {
            warn!(requested = requested.as_str(), used = used.as_str(), "Provider not configured");
            if !cli.json {
                println!("Provider '{requested}' is not configured, falling back to {used}");
            }
            used
        }
        ProviderChoice::Unavailable => {
            eprintln!("No LLM providers are configured. Check your .env file or agent.toml.");
            return Ok(ExitCode::FAILURE);
        }
    };

    let agent = AutonomousAgent::from_config(&config)?;

    if cli.interactive {
        interactive::run(&agent, &config, provider).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(goal) = cli.goal.clone() else {
        eprintln!("A goal is required unless --interactive or --check-config is given");
        return Ok(ExitCode::from(2));
    };

    let mut request = RunRequest::new(goal).with_provider(provider);
    if let Some(message) = cli.message.clone() {
        request = request.with_message(message);
    }

    if !cli.json {
        println!("Goal: {}", request.goal);
        println!("Using LLM: {provider}");
        println!("{}", "-".repeat(50));
    }

    if cli.streaming {
        let mut updates = agent.run_streaming(request);
        while let Some(update) = updates.next().await {
            if cli.json {
                println!("{}", serde_json::to_string(&update)?);
            } else if let Some(line) = report::render_update(&update) {
                println!("{line}");
            }
        }
    } else {
        let state = agent.run(request).await;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
        } else {
            println!("{}", report::render_summary(&state));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(quiet: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
