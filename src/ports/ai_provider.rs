//! Chat completion port.
//!
//! Every model call this crate makes is single-turn: one instruction block and
//! one input block in, one text reply out. Callers decode the reply
//! themselves, so the port only knows about text and an optional JSON-only
//! reply mode.

use async_trait::async_trait;

use crate::domain::foundation::RunId;

/// A chat completion backend.
#[async_trait]
pub trait AIProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;
}

/// One single-turn completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Short name of the calling operation, used in logs.
    pub operation: &'static str,
    /// Correlates provider retries with the caller's logs.
    pub run_id: RunId,
    /// Sent as the system message.
    pub instructions: String,
    /// Sent as the user message.
    pub input: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the provider to constrain the reply to a JSON object.
    pub json_reply: bool,
}

impl CompletionRequest {
    /// Deterministic (temperature 0) text request with a fresh run id.
    pub fn new(
        operation: &'static str,
        instructions: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            run_id: RunId::new(),
            instructions: instructions.into(),
            input: input.into(),
            temperature: 0.0,
            max_tokens: None,
            json_reply: false,
        }
    }

    pub fn json_reply(mut self) -> Self {
        self.json_reply = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }
}

/// A model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub content: String,
    /// Model that actually answered; may differ from the requested alias.
    pub model: String,
    /// The reply stopped at `max_tokens`.
    pub truncated: bool,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            truncated: false,
            usage: TokenUsage::default(),
        }
    }
}

/// Tokens billed for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input.saturating_add(self.output)
    }
}

/// Completion failures.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("prompt exceeds the model context window: {0}")]
    ContextTooLong(String),

    #[error("reply withheld by the content filter")]
    ContentFiltered,

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider rejected the API key")]
    AuthenticationFailed,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no reply within {0}s")]
    Timeout(u64),

    #[error("unreadable provider reply: {0}")]
    Protocol(String),
}

impl AIError {
    /// Whether the same request may succeed if sent again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited(_)
                | AIError::Unavailable(_)
                | AIError::Transport(_)
                | AIError::Timeout(_)
        )
    }
}
