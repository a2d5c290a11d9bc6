//! Chat transcript persistence

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ChatPersistence, ProviderError};

/// Records each exchange in the log only
#[derive(Debug, Clone, Default)]
pub struct TracingPersistence;

#[async_trait]
impl ChatPersistence for TracingPersistence {
    async fn save(&self, user_message: &str, ai_response: &str, image_path: Option<&str>) -> Result<(), ProviderError> {
        info!(
            user_len = user_message.len(),
            response_len = ai_response.len(),
            ?image_path,
            "Chat exchange"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptEntry<'a> {
    timestamp: String,
    user_message: &'a str,
    ai_response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_path: Option<&'a str>,
}

/// Appends one JSON line per exchange to a file
#[derive(Debug, Clone)]
pub struct JsonlTranscript {
    path: PathBuf,
}

impl JsonlTranscript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChatPersistence for JsonlTranscript {
    async fn save(&self, user_message: &str, ai_response: &str, image_path: Option<&str>) -> Result<(), ProviderError> {
        debug!(path = %self.path.display(), "JsonlTranscript::save: called");
        let entry = TranscriptEntry {
            timestamp: Utc::now().to_rfc3339(),
            user_message,
            ai_response,
            image_path,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            file.write_all(line.as_bytes())
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(())
    }
}
