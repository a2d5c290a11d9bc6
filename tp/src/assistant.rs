//! The complete turn pipeline
//!
//! classify (model, or offline extraction) → session turn → compose → persist.
//! Every stage degrades instead of failing: a broken model call falls back to
//! offline extraction, a broken composition to the raw context, and a failed
//! transcript write is only logged.

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{Engine, EngineSettings, LlmExtraction, SessionState, TurnOutcome};
use crate::extract::OfflineExtractor;
use crate::llm::{Classifier, Composer, LlmClient, create_client, fallback_reply};
use crate::prompts::PromptLoader;
use crate::provider::{
    ChatPersistence, ExternalDataProvider, HttpDataProvider, ItineraryGenerator, JsonlTranscript,
    LlmItineraryGenerator, OfflineItineraryGenerator, TracingPersistence, UnavailableProvider,
};
use crate::session::{SessionError, SessionManager};

/// Where a turn's extraction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Model,
    Offline,
}

/// What the user sees for one message, plus the engine's full outcome
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub source: ExtractionSource,
    pub outcome: TurnOutcome,
}

struct ModelStages {
    classifier: Classifier,
    composer: Composer,
}

pub struct Assistant {
    sessions: SessionManager,
    extractor: OfflineExtractor,
    model: Option<ModelStages>,
    persistence: Arc<dyn ChatPersistence>,
}

impl Assistant {
    /// Offline assistant: keyword extraction and plain replies
    pub fn new(engine: Arc<Engine>, persistence: Arc<dyn ChatPersistence>) -> Self {
        debug!("Assistant::new: called");
        let extractor = OfflineExtractor::new(engine.matchers().clone());
        Self {
            sessions: SessionManager::new(engine),
            extractor,
            model: None,
            persistence,
        }
    }

    /// Classify and compose through the model
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        debug!(max_tokens, "Assistant::with_llm: called");
        self.model = Some(ModelStages {
            classifier: Classifier::new(llm.clone(), prompts.clone(), max_tokens),
            composer: Composer::new(llm, prompts, max_tokens),
        });
        self
    }

    /// Wire every collaborator from configuration
    ///
    /// Missing pieces degrade: no API key means offline extraction and the
    /// offline itinerary generator, no provider URL means every fetch fails
    /// gracefully.
    pub fn from_config(config: &Config) -> Result<Self> {
        debug!("Assistant::from_config: called");
        let prompts = Arc::new(PromptLoader::new(config.prompts.dir.as_deref()));

        let llm = if config.llm.is_enabled() {
            match create_client(&config.llm) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "LLM unavailable, using offline extraction");
                    None
                }
            }
        } else {
            info!(provider = %config.llm.provider, "LLM not enabled, using offline extraction");
            None
        };

        let provider: Arc<dyn ExternalDataProvider> = match HttpDataProvider::from_config(&config.provider) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                warn!(error = %e, "External data provider unavailable");
                Arc::new(UnavailableProvider)
            }
        };

        let generator: Arc<dyn ItineraryGenerator> = match &llm {
            Some(client) => Arc::new(LlmItineraryGenerator::new(
                client.clone(),
                prompts.clone(),
                config.llm.max_tokens,
            )),
            None => Arc::new(OfflineItineraryGenerator),
        };

        let persistence: Arc<dyn ChatPersistence> = match transcript_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).context("Failed to create transcript directory")?;
                }
                Arc::new(JsonlTranscript::new(path))
            }
            None => Arc::new(TracingPersistence),
        };

        let engine = Arc::new(Engine::new(
            EngineSettings::from_config(&config.conversation),
            provider,
            generator,
        ));
        let assistant = Self::new(engine, persistence);
        Ok(match llm {
            Some(client) => assistant.with_llm(client, prompts, config.llm.max_tokens),
            None => assistant,
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn uses_model(&self) -> bool {
        self.model.is_some()
    }

    /// Answer one user message in a session
    pub async fn respond(&self, session_id: &str, message: &str) -> Result<Reply, SessionError> {
        debug!(%session_id, len = message.len(), "Assistant::respond: called");
        let state = match self.sessions.snapshot(session_id).await {
            Ok(state) => state,
            Err(SessionError::NotFound(_)) => self.sessions.engine().new_session(),
            Err(e) => return Err(e),
        };

        let (extraction, source) = self.extract(message, &state).await;
        let outcome = self.sessions.process_turn(session_id, message, extraction).await?;

        let text = match &self.model {
            Some(stages) => stages.composer.compose(message, &outcome).await,
            None => fallback_reply(&outcome),
        };

        if let Err(e) = self.persistence.save(message, &text, None).await {
            warn!(error = %e, "Failed to persist exchange");
        }

        info!(%session_id, intent = %outcome.intent, next_state = %outcome.next_state, ?source, "Turn answered");
        Ok(Reply { text, source, outcome })
    }

    async fn extract(&self, message: &str, state: &SessionState) -> (LlmExtraction, ExtractionSource) {
        if let Some(stages) = &self.model {
            let today = self.sessions.engine().clock().today();
            match stages.classifier.classify(message, state, today).await {
                Ok(extraction) => return (extraction, ExtractionSource::Model),
                Err(e) => warn!(error = %e, "Classification failed, using offline extraction"),
            }
        }
        (self.extractor.extract(message, state.state), ExtractionSource::Offline)
    }
}

/// `<data_local_dir>/tripplanner/transcript.jsonl`
pub fn transcript_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("tripplanner").join("transcript.jsonl"))
}
