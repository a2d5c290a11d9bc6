//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::StructuredItinerary;

/// tp - conversational trip planner
#[derive(Parser)]
#[command(
    name = "tp",
    about = "Conversational travel planner with intent reconciliation",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute; defaults to chat
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chat interactively
    Chat {
        /// First message to send
        message: Option<String>,
    },

    /// Show what offline extraction makes of a message
    Classify {
        /// The message to classify
        text: String,

        /// Conversation state to classify in (e.g. TRIP_BUILDING_MODE)
        #[arg(short, long, default_value = "IDLE")]
        state: String,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Resolve a day reference ("day 3", "the second day") against an itinerary
    ResolveDay {
        /// Itinerary file, JSON or plain text
        file: PathBuf,

        /// The day reference
        day_ref: String,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },
}

/// Output format for classify/resolve-day
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    #[default]
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use 'text' or 'json'", s)),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tripplanner")
        .join("logs")
        .join("tripplanner.log")
}

/// Load an itinerary from a JSON document, or parse it as free text
pub fn read_itinerary(path: &Path) -> Result<StructuredItinerary> {
    debug!(path = %path.display(), "read_itinerary: called");
    let content = std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    if content.trim_start().starts_with('{') {
        debug!("read_itinerary: parsing as JSON");
        return serde_json::from_str(&content).context(format!("Invalid itinerary JSON in {}", path.display()));
    }
    debug!("read_itinerary: parsing as text");
    Ok(StructuredItinerary::parse(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_classify_args() {
        let cli = Cli::try_parse_from(["tp", "classify", "hotel in Rome", "--state", "IDLE", "-f", "text"]).unwrap();
        match cli.command {
            Some(Command::Classify { text, state, format }) => {
                assert_eq!(text, "hotel in Rome");
                assert_eq!(state, "IDLE");
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_output_format_rejects_unknown() {
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
    }

    #[test]
    fn test_read_itinerary_text_and_json() {
        let mut text = tempfile::NamedTempFile::new().unwrap();
        writeln!(text, "Rome Trip\nDay 1: Arrival\nDate: 2025-06-15\n- Colosseum").unwrap();
        let parsed = read_itinerary(text.path()).unwrap();
        assert_eq!(parsed.days.len(), 1);

        let mut json = tempfile::NamedTempFile::new().unwrap();
        write!(json, "{}", serde_json::to_string(&parsed).unwrap()).unwrap();
        assert_eq!(read_itinerary(json.path()).unwrap(), parsed);
    }

    #[test]
    fn test_read_itinerary_bad_json() {
        let mut json = tempfile::NamedTempFile::new().unwrap();
        write!(json, "{{ not json").unwrap();
        assert!(read_itinerary(json.path()).is_err());
    }
}
