//! Final answer over fetched data

use std::sync::Arc;
use tracing::{debug, warn};

use super::{CompletionRequest, LlmClient, LlmError};
use crate::engine::TurnOutcome;
use crate::itinerary::DayResolution;
use crate::prompts::{ComposeContext, PromptLoader};

/// "day 2 (2025-06-16, Rome, Italy)", noting a guessed year
pub fn describe_day(day: &DayResolution) -> String {
    let mut parts = Vec::new();
    if let Some(date) = &day.date {
        parts.push(date.clone());
    }
    if let Some(location) = &day.location {
        parts.push(location.clone());
    }
    let mut out = format!("day {}", day.day_number);
    if !parts.is_empty() {
        out.push_str(&format!(" ({})", parts.join(", ")));
    }
    if day.needs_confirmation {
        out.push_str("; the year was inferred, ask the user to confirm it");
    }
    out
}

pub struct Composer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl Composer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    /// Write the reply for a turn that produced external context
    ///
    /// Turns without context keep the engine's reply; a failed composition
    /// falls back to the reply followed by the raw context.
    pub async fn compose(&self, message: &str, outcome: &TurnOutcome) -> String {
        let Some(context) = outcome.external_context.as_deref() else {
            return outcome.response.clone();
        };
        debug!(len = context.len(), "Composer::compose: called");
        match self.try_compose(message, context, outcome).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Composition failed, returning raw context");
                fallback_reply(outcome)
            }
        }
    }

    async fn try_compose(&self, message: &str, context: &str, outcome: &TurnOutcome) -> Result<String, LlmError> {
        let ctx = ComposeContext {
            message: message.to_string(),
            context: context.to_string(),
            beyond_forecast_horizon: outcome.flags.beyond_forecast_horizon,
            day_context: outcome.day_context.as_ref().map(describe_day),
        };
        let system = self
            .prompts
            .render("compose", &ctx)
            .map_err(|e| LlmError::Prompt(e.to_string()))?;
        let response = self
            .llm
            .complete(CompletionRequest::single(system, message, self.max_tokens))
            .await?;
        response
            .content
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("empty composition".to_string()))
    }
}

/// Engine reply plus the raw context block
pub fn fallback_reply(outcome: &TurnOutcome) -> String {
    match outcome.external_context.as_deref() {
        Some(context) => format!("{}\n\n{}", outcome.response, context.trim_end()),
        None => outcome.response.clone(),
    }
}
