//! tp - conversational trip planner
//!
//! CLI entry point: interactive chat plus offline inspection commands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use tripplanner::cli::{Cli, Command, OutputFormat, get_log_path, read_itinerary};
use tripplanner::config::Config;
use tripplanner::domain::ConversationState;
use tripplanner::extract::OfflineExtractor;
use tripplanner::itinerary::resolve_day_reference;
use tripplanner::llm::describe_day;
use tripplanner::normalize::{Clock, SystemClock};
use tripplanner::repl;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!(llm = %config.llm.provider, model = %config.llm.model, "tp loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Chat { message }) => {
            debug!("main: matched Chat command");
            repl::run_interactive(&config, message).await
        }
        Some(Command::Classify { text, state, format }) => {
            debug!(%text, %state, ?format, "main: matched Classify command");
            cmd_classify(&text, &state, format)
        }
        Some(Command::ResolveDay { file, day_ref, format }) => {
            debug!(?file, %day_ref, ?format, "main: matched ResolveDay command");
            cmd_resolve_day(&file, &day_ref, format)
        }
        None => {
            debug!("main: no command, starting chat");
            repl::run_interactive(&config, None).await
        }
    }
}

fn cmd_classify(text: &str, state: &str, format: OutputFormat) -> Result<()> {
    let state = ConversationState::parse(state).ok_or_else(|| eyre::eyre!("Unknown conversation state: {}", state))?;
    let extraction = OfflineExtractor::default().extract(text, state);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&extraction)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "intent:".bright_cyan(), extraction.intent.as_str().unwrap_or("-"));
            for (key, value) in &extraction.data {
                println!("  {} {}", format!("{}:", key).yellow(), value);
            }
            if let Some(missing) = extraction.missing_fields.as_ref().filter(|m| !m.is_empty()) {
                println!("{} {}", "missing:".bright_cyan(), missing.join(", "));
            }
            if let Some(next) = &extraction.next_state {
                println!("{} {}", "next state:".bright_cyan(), next);
            }
        }
    }
    Ok(())
}

fn cmd_resolve_day(file: &Path, day_ref: &str, format: OutputFormat) -> Result<()> {
    let itinerary = read_itinerary(file)?;
    let today = SystemClock.today();
    let resolution = resolve_day_reference(&itinerary, day_ref, today)
        .ok_or_else(|| eyre::eyre!("No day in {} matches '{}'", file.display(), day_ref))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
        OutputFormat::Text => println!("{}", describe_day(&resolution)),
    }
    Ok(())
}
