//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::domain::{ConversationState, Intent, TripDraft};

/// One allowed intent as shown to the model
#[derive(Debug, Clone, Serialize)]
pub struct IntentEntry {
    pub label: &'static str,
    pub description: &'static str,
}

/// Context for the `classify` template
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyContext {
    pub message: String,
    pub state: String,
    pub today: String,
    pub draft: Option<String>,
    pub pending_fields: Option<String>,
    pub intents: Vec<IntentEntry>,
    pub states: String,
}

impl ClassifyContext {
    pub fn new(
        message: &str,
        state: ConversationState,
        today: NaiveDate,
        draft: &TripDraft,
        pending_fields: &[String],
    ) -> Self {
        debug!(%state, pending = pending_fields.len(), "ClassifyContext::new: called");
        let summary = draft.summary();
        Self {
            message: message.to_string(),
            state: state.as_str().to_string(),
            today: today.format("%Y-%m-%d").to_string(),
            draft: (!summary.is_empty()).then_some(summary),
            pending_fields: (!pending_fields.is_empty()).then(|| pending_fields.join(", ")),
            intents: Intent::ALL
                .iter()
                .map(|i| IntentEntry {
                    label: i.as_str(),
                    description: i.describe(),
                })
                .collect(),
            states: ConversationState::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Context for the `compose` template
#[derive(Debug, Clone, Serialize)]
pub struct ComposeContext {
    pub message: String,
    pub context: String,
    pub beyond_forecast_horizon: bool,
    pub day_context: Option<String>,
}

/// Context for the `itinerary` template
#[derive(Debug, Clone, Serialize)]
pub struct ItineraryContext {
    pub destination: String,
    pub duration: String,
    pub dates: String,
    pub budget: String,
    pub travelers: Option<u32>,
    pub notes: Option<String>,
}

impl ItineraryContext {
    pub fn from_draft(draft: &TripDraft) -> Self {
        let dates = match draft.dates.as_ref().map(|d| (&d.from, &d.to)) {
            Some((Some(from), Some(to))) => format!("{} to {}", from, to),
            Some((Some(from), None)) => format!("starting {}", from),
            _ => "flexible".to_string(),
        };
        Self {
            destination: draft.vacation_location.clone().unwrap_or_default(),
            duration: draft.duration.map(|d| d.to_string()).unwrap_or_default(),
            dates,
            budget: draft.budget.clone().unwrap_or_else(|| "moderate".to_string()),
            travelers: draft.travelers,
            notes: draft.notes.clone(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `dir` for overrides before the embedded prompts
    pub fn new(dir: Option<&Path>) -> Self {
        let user_dir = dir.map(Path::to_path_buf).filter(|d| d.exists());
        debug!(?user_dir, "PromptLoader::new: called");
        Self {
            hbs: Self::engine(),
            user_dir,
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `{dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
