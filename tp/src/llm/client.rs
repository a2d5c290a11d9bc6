//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Classification, composition and itinerary generation each send one
/// self-contained request; conversation state lives in the engine, never in
/// the client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock LLM client for unit tests
    pub struct MockLlmClient {
        responses: Vec<Result<CompletionResponse, String>>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                responses: responses.into_iter().map(Ok).collect(),
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Replies with plain text content, in order
        pub fn with_texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| CompletionResponse::text(*t)).collect())
        }

        /// Every call fails with an API error
        pub fn failing() -> Self {
            Self {
                responses: vec![Err("mock failure".to_string())],
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            debug!("MockLlmClient::call_count: called");
            self.call_count.load(Ordering::SeqCst)
        }

        /// Requests seen so far
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            if let Ok(mut seen) = self.requests.lock() {
                seen.push(request);
            }
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::complete: fetching response");
            match self.responses.get(idx).or_else(|| self.responses.last().filter(|r| r.is_err())) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(message)) => Err(LlmError::ApiError {
                    status: 500,
                    message: message.clone(),
                }),
                None => {
                    debug!("MockLlmClient::complete: no more mock responses");
                    Err(LlmError::InvalidResponse("No more mock responses".to_string()))
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::with_texts(&["Response 1", "Response 2"]);
            let req = CompletionRequest::single("Test", "hi", 1000);

            let resp1 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert!(client.complete(req).await.is_err());
            assert_eq!(client.call_count(), 3);
            assert_eq!(client.requests().len(), 3);
        }

        #[tokio::test]
        async fn test_failing_mock_keeps_failing() {
            let client = MockLlmClient::failing();
            let req = CompletionRequest::single("Test", "hi", 10);
            assert!(client.complete(req.clone()).await.is_err());
            assert!(client.complete(req).await.is_err());
        }
    }
}
