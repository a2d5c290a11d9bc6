//! Message classification through the LLM

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

use super::{CompletionRequest, LlmClient, LlmError, parse_extraction};
use crate::engine::{LlmExtraction, SessionState};
use crate::prompts::{ClassifyContext, PromptLoader};

pub struct Classifier {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    /// Ask the model for intent, data and a suggested next state
    pub async fn classify(&self, message: &str, session: &SessionState, today: NaiveDate) -> Result<LlmExtraction, LlmError> {
        debug!(state = %session.state, "Classifier::classify: called");
        let pending = session
            .missing
            .as_ref()
            .filter(|m| !m.submitted)
            .map(|m| m.fields.clone())
            .unwrap_or_default();
        let ctx = ClassifyContext::new(message, session.state, today, &session.draft, &pending);
        let system = self
            .prompts
            .render("classify", &ctx)
            .map_err(|e| LlmError::Prompt(e.to_string()))?;

        let response = self
            .llm
            .complete(CompletionRequest::single(system, message, self.max_tokens))
            .await?;
        let text = response
            .content
            .ok_or_else(|| LlmError::InvalidResponse("empty classification reply".to_string()))?;
        let extraction = parse_extraction(&text)?;
        info!(intent = %extraction.intent, next_state = ?extraction.next_state, "Message classified");
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConversationState;
    use crate::llm::client::mock::MockLlmClient;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()
    }

    #[tokio::test]
    async fn test_classify_parses_reply() {
        let llm = Arc::new(MockLlmClient::with_texts(&[
            r#"{"intent":"Weather-Request","data":{"city":"Tel Aviv","country":"Israel","time":"now"},"next_state":"FETCHING_EXTERNAL_DATA"}"#,
        ]));
        let classifier = Classifier::new(llm.clone(), Arc::new(PromptLoader::embedded_only()), 512);
        let session = SessionState::default();

        let ex = classifier
            .classify("What's the weather now in Tel Aviv, Israel?", &session, today())
            .await
            .unwrap();

        assert_eq!(ex.intent, json!("Weather-Request"));
        assert_eq!(ex.next_state.as_deref(), Some(ConversationState::FetchingExternalData.as_str()));
        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system_prompt.contains("2025-06-11"));
        assert_eq!(requests[0].max_tokens, 512);
    }

    #[tokio::test]
    async fn test_classify_propagates_llm_failure() {
        let classifier = Classifier::new(
            Arc::new(MockLlmClient::failing()),
            Arc::new(PromptLoader::embedded_only()),
            512,
        );
        let result = classifier.classify("hi", &SessionState::default(), today()).await;
        assert!(matches!(result, Err(LlmError::ApiError { status: 500, .. })));
    }
}
