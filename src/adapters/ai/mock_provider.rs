//! Scripted [`AIProvider`] for tests.
//!
//! Replies are consumed in the order they were scripted. Once the script runs
//! out every call fails with [`AIError::Unavailable`], so a test that makes
//! more model calls than it expected fails loudly instead of classifying
//! against a canned default.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{AIError, AIProvider, CompletionRequest, CompletionResponse, TokenUsage};

const MOCK_MODEL: &str = "mock-model";

/// Test double that records requests and replays a script.
#[derive(Debug, Default)]
pub struct MockAIProvider {
    script: Mutex<VecDeque<Result<CompletionResponse, AIError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a plain text reply.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        let mut reply = CompletionResponse::new(content, MOCK_MODEL);
        reply.usage = TokenUsage {
            input: 10,
            output: 20,
        };
        self.push(Ok(reply))
    }

    /// Scripts a reply whose content is the serialized JSON value.
    pub fn with_json_response(self, value: serde_json::Value) -> Self {
        self.with_response(value.to_string())
    }

    /// Scripts a reply that stopped at the token limit.
    pub fn with_truncated_response(self, content: impl Into<String>) -> Self {
        let mut reply = CompletionResponse::new(content, MOCK_MODEL);
        reply.truncated = true;
        self.push(Ok(reply))
    }

    /// Scripts a failure.
    pub fn with_error(self, error: AIError) -> Self {
        self.push(Err(error))
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    /// Requests received so far, oldest first.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        self.lock_calls().clone()
    }

    fn push(self, entry: Result<CompletionResponse, AIError>) -> Self {
        self.script
            .lock()
            .expect("MockAIProvider: script lock poisoned")
            .push_back(entry);
        self
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        self.calls
            .lock()
            .expect("MockAIProvider: calls lock poisoned")
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        self.lock_calls().push(request);
        self.script
            .lock()
            .expect("MockAIProvider: script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(AIError::Unavailable("mock script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }
}
