//! Trip planner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::matcher::Locale;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Conversation engine tuning
    pub conversation: ConversationConfig,

    /// External data provider
    pub provider: ProviderConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,

    /// Log level used when no `--log-level` flag is given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .tripplanner.yml
        let local_config = PathBuf::from(".tripplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/tripplanner/tripplanner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tripplanner").join("tripplanner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name; "anthropic", or "none" to run on offline extraction only
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!(
            "LLM API key not found. Set the {} environment variable.",
            self.api_key_env
        ))
    }

    /// Is an LLM configured and reachable in principle
    pub fn is_enabled(&self) -> bool {
        self.provider != "none" && std::env::var(&self.api_key_env).is_ok()
    }
}

/// Conversation engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Days ahead a live weather forecast is available
    #[serde(rename = "forecast-horizon-days")]
    pub forecast_horizon_days: i64,

    /// Recent intents kept in memory
    #[serde(rename = "memory-capacity")]
    pub memory_capacity: usize,

    /// Hours of inactivity before memory is dropped
    #[serde(rename = "memory-ttl-hours")]
    pub memory_ttl_hours: i64,

    /// Longest message still treated as an acknowledgment
    #[serde(rename = "ack-max-tokens")]
    pub ack_max_tokens: usize,

    /// Language for canned replies
    #[serde(rename = "default-locale")]
    pub default_locale: LocaleSetting,

    /// Timeout for a single external fetch in milliseconds
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            forecast_horizon_days: 5,
            memory_capacity: 10,
            memory_ttl_hours: 24,
            ack_max_tokens: 6,
            default_locale: LocaleSetting::En,
            fetch_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocaleSetting {
    #[default]
    En,
    He,
}

impl From<LocaleSetting> for Locale {
    fn from(value: LocaleSetting) -> Self {
        match value {
            LocaleSetting::En => Locale::English,
            LocaleSetting::He => Locale::Hebrew,
        }
    }
}

/// External data provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the travel data service; without one every fetch fails
    /// gracefully
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Environment variable holding the service key, if it needs one
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles per retry
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: None,
            timeout_ms: 10_000,
            max_retries: 3,
            initial_backoff_ms: 500,
        }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory whose `<name>.pmt` files override the embedded templates
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.conversation.forecast_horizon_days, 5);
        assert_eq!(config.conversation.memory_capacity, 10);
        assert_eq!(config.conversation.memory_ttl_hours, 24);
        assert_eq!(config.provider.max_retries, 3);
        assert!(config.provider.base_url.is_none());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: none
  model: claude-haiku
  max-tokens: 1024

conversation:
  forecast-horizon-days: 7
  ack-max-tokens: 4
  default-locale: he

provider:
  base-url: http://localhost:9000
  max-retries: 1

prompts:
  dir: /tmp/prompts

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.provider, "none");
        assert!(!config.llm.is_enabled());
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.conversation.forecast_horizon_days, 7);
        assert_eq!(config.conversation.ack_max_tokens, 4);
        assert_eq!(config.conversation.default_locale, LocaleSetting::He);
        assert_eq!(config.conversation.memory_capacity, 10);
        assert_eq!(config.provider.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.provider.max_retries, 1);
        assert_eq!(config.provider.initial_backoff_ms, 500);
        assert_eq!(config.prompts.dir, Some(PathBuf::from("/tmp/prompts")));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "llm:\n  model: claude-haiku").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.llm.model, "claude-haiku");
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/tripplanner.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
