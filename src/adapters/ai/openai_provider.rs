//! OpenAI-compatible `/chat/completions` implementation of [`AIProvider`].
//!
//! Rate limits, 5xx replies and transport failures are retried with the same
//! backoff as the other HTTP adapters. A `content_filter` finish becomes
//! [`AIError::ContentFiltered`]; a `length` finish marks the reply truncated.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::adapters::retry::{
    is_retryable_status, parse_retry_after, retry_delay, truncate_for_error,
};
use crate::ports::{AIError, AIProvider, CompletionRequest, CompletionResponse, TokenUsage};

/// Wait reported for a 429 without a `Retry-After` header.
const DEFAULT_RATE_LIMIT_SECS: u64 = 30;

/// Connection settings for one model endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_base_delay_ms: 1_000,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = delay_ms;
        self
    }
}

pub struct OpenAIProvider {
    config: OpenAIConfig,
    http: reqwest::Client,
}

/// A failed attempt plus the server's requested wait, if any.
struct Failure {
    error: AIError,
    retry_after: Option<Duration>,
}

impl From<AIError> for Failure {
    fn from(error: AIError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.input,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_reply.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<CompletionResponse, Failure> {
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(Failure {
                error: status_error(status.as_u16(), &text, retry_after),
                retry_after,
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| AIError::Protocol(e.to_string()))?;
        Ok(into_completion(reply)?)
    }

    fn transport_error(&self, error: reqwest::Error) -> AIError {
        if error.is_timeout() {
            AIError::Timeout(self.config.timeout.as_secs())
        } else {
            AIError::Transport(error.to_string())
        }
    }
}

fn status_error(status: u16, body: &str, retry_after: Option<Duration>) -> AIError {
    let detail = truncate_for_error(body, 300);
    match status {
        401 | 403 => AIError::AuthenticationFailed,
        429 => AIError::RateLimited(retry_after.map_or(DEFAULT_RATE_LIMIT_SECS, |d| d.as_secs())),
        400 if body.contains("context_length_exceeded")
            || body.contains("maximum context length") =>
        {
            AIError::ContextTooLong(detail)
        }
        s if is_retryable_status(s) => AIError::Unavailable(format!("status {s}: {detail}")),
        s => AIError::Rejected(format!("status {s}: {detail}")),
    }
}

fn into_completion(reply: ChatResponse) -> Result<CompletionResponse, AIError> {
    let choice = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AIError::Protocol("reply has no choices".to_string()))?;

    let truncated = match choice.finish_reason.as_deref() {
        Some("content_filter") => return Err(AIError::ContentFiltered),
        Some("length") => true,
        _ => false,
    };

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        model: reply.model,
        truncated,
        usage: reply
            .usage
            .map(|u| TokenUsage {
                input: u.prompt_tokens,
                output: u.completion_tokens,
            })
            .unwrap_or_default(),
    })
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let body = self.request_body(&request);
        let mut attempt = 0_usize;

        loop {
            attempt += 1;
            let failure = match self.send_once(&body).await {
                Ok(completion) => {
                    tracing::debug!(
                        operation = request.operation,
                        run_id = %request.run_id,
                        model = %completion.model,
                        tokens = completion.usage.total(),
                        truncated = completion.truncated,
                        "completion finished"
                    );
                    return Ok(completion);
                }
                Err(failure) => failure,
            };

            if !failure.error.is_transient() || attempt > self.config.max_retries as usize {
                return Err(failure.error);
            }
            tracing::warn!(
                operation = request.operation,
                run_id = %request.run_id,
                attempt,
                error = %failure.error,
                "completion failed, retrying"
            );
            tokio::time::sleep(retry_delay(
                self.config.retry_base_delay_ms,
                attempt,
                failure.retry_after,
            ))
            .await;
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    fn provider_for(server: &MockServer, max_retries: u32) -> OpenAIProvider {
        OpenAIProvider::new(
            OpenAIConfig::new("test-key")
                .with_base_url(server.url("/v1"))
                .with_max_retries(max_retries)
                .with_retry_base_delay_ms(1),
        )
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("triage", "Classify", "Issue text").json_reply()
    }

    fn reply_body(content: &str, finish_reason: &str) -> Value {
        json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": finish_reason
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 4 }
        })
    }

    #[test]
    fn body_sends_instructions_then_input() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k")).unwrap();
        let request = request();
        let body = serde_json::to_value(provider.request_body(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Classify");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Issue text");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn text_requests_omit_response_format() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k")).unwrap();
        let request = CompletionRequest::new("triage", "s", "u").with_max_tokens(64);
        let body = serde_json::to_value(provider.request_body(&request)).unwrap();

        assert!(body.get("response_format").is_none());
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn status_errors_are_classified() {
        assert!(matches!(status_error(401, "", None), AIError::AuthenticationFailed));
        assert!(matches!(status_error(429, "", None), AIError::RateLimited(30)));
        assert!(matches!(
            status_error(429, "", Some(Duration::from_secs(7))),
            AIError::RateLimited(7)
        ));
        assert!(matches!(
            status_error(400, r#"{"error":{"code":"context_length_exceeded"}}"#, None),
            AIError::ContextTooLong(_)
        ));
        assert!(matches!(status_error(400, "bad", None), AIError::Rejected(_)));
        assert!(matches!(status_error(502, "", None), AIError::Unavailable(_)));
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("Authorization", "Bearer test-key")
                .body_includes("json_object");
            then.status(200)
                .json_body(reply_body("{\"isLikelyABug\":true}", "stop"));
        });

        let response = provider_for(&server, 0).complete(request()).await.unwrap();

        mock.assert();
        assert_eq!(response.content, "{\"isLikelyABug\":true}");
        assert_eq!(response.model, "gpt-4o-2024-08-06");
        assert_eq!(response.usage.total(), 16);
        assert!(!response.truncated);
    }

    #[tokio::test]
    async fn length_finish_marks_reply_truncated() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(reply_body("{\"isLikelyA", "length"));
        });

        let response = provider_for(&server, 0).complete(request()).await.unwrap();

        assert!(response.truncated);
    }

    #[tokio::test]
    async fn content_filter_finish_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(reply_body("", "content_filter"));
        });

        let err = provider_for(&server, 0).complete(request()).await.unwrap_err();

        assert!(matches!(err, AIError::ContentFiltered));
    }

    #[tokio::test]
    async fn reply_without_choices_is_a_protocol_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "model": "gpt-4o", "choices": [] }));
        });

        let err = provider_for(&server, 0).complete(request()).await.unwrap_err();

        assert!(matches!(err, AIError::Protocol(_)));
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("bad key");
        });

        let err = provider_for(&server, 3).complete(request()).await.unwrap_err();

        assert!(matches!(err, AIError::AuthenticationFailed));
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_exhausted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(503).body("overloaded");
        });

        let err = provider_for(&server, 2).complete(request()).await.unwrap_err();

        assert!(matches!(err, AIError::Unavailable(_)));
        mock.assert_hits(3);
    }

    #[tokio::test]
    async fn rate_limit_honors_retry_after() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).header("Retry-After", "0").body("slow down");
        });

        let err = provider_for(&server, 1).complete(request()).await.unwrap_err();

        assert!(matches!(err, AIError::RateLimited(0)));
        mock.assert_hits(2);
    }
}
