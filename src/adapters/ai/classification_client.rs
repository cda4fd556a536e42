//! Structured-output client over an [`AIProvider`].
//!
//! Sends a [`StructuredPrompt`] in JSON mode and decodes the reply into the
//! requested type. The JSON schema travels in the system prompt; replies
//! wrapped in markdown code fences are accepted.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::issue::{AreaLabelSuggestion, ClassificationResult};
use crate::ports::{
    AIProvider, AreaLabelSuggester, ClassificationError, CompletionRequest, IssueClassifier,
    StructuredPrompt,
};

/// Classification client backed by a chat completion provider.
pub struct ClassificationClient {
    provider: Arc<dyn AIProvider>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ClassificationClient {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Runs the prompt and decodes the reply as `T`.
    pub async fn complete<T: DeserializeOwned>(
        &self,
        prompt: &StructuredPrompt,
        operation: &'static str,
    ) -> Result<T, ClassificationError> {
        let mut request = CompletionRequest::new(
            operation,
            system_prompt_with_schema(prompt),
            prompt.user.clone(),
        )
        .with_temperature(self.temperature)
        .json_reply();
        if let Some(max) = self.max_tokens {
            request = request.with_max_tokens(max);
        }

        let response = self.provider.complete(request).await?;
        decode_reply(&response.content).map_err(|err| match err {
            ClassificationError::Malformed(reason) if response.truncated => {
                ClassificationError::Malformed(format!("reply cut off at the token limit: {reason}"))
            }
            other => other,
        })
    }
}

/// Appends the expected shape and its schema to the system prompt.
fn system_prompt_with_schema(prompt: &StructuredPrompt) -> String {
    format!(
        "{}\n\nRespond only with JSON describing a {} that matches this JSON schema:\n{}",
        prompt.system.trim_end(),
        prompt.shape_name,
        prompt.schema
    )
}

/// Removes a surrounding markdown code fence, with or without a language tag.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn decode_reply<T: DeserializeOwned>(content: &str) -> Result<T, ClassificationError> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(ClassificationError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(|e| ClassificationError::Malformed(e.to_string()))
}

/// JSON mode only yields objects, so suggestion lists may arrive wrapped.
#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionReply {
    Bare(Vec<AreaLabelSuggestion>),
    Wrapped { suggestions: Vec<AreaLabelSuggestion> },
}

#[async_trait]
impl IssueClassifier for ClassificationClient {
    async fn classify(
        &self,
        prompt: &StructuredPrompt,
    ) -> Result<ClassificationResult, ClassificationError> {
        self.complete(prompt, "triage").await
    }
}

#[async_trait]
impl AreaLabelSuggester for ClassificationClient {
    async fn suggest(
        &self,
        prompt: &StructuredPrompt,
    ) -> Result<Vec<AreaLabelSuggestion>, ClassificationError> {
        let reply: SuggestionReply = self.complete(prompt, "area-labels").await?;
        Ok(match reply {
            SuggestionReply::Bare(list) => list,
            SuggestionReply::Wrapped { suggestions } => suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::ports::AIError;
    use serde_json::json;

    fn prompt() -> StructuredPrompt {
        StructuredPrompt::new(
            "You triage issues.",
            "Issue Title: Crash",
            "ClassificationResult",
            ClassificationResult::json_schema(),
        )
    }

    #[test]
    fn strips_fences_with_language_tag() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn classify_decodes_json_reply() {
        let provider = Arc::new(MockAIProvider::new().with_json_response(json!({
            "isLikelyABug": true,
            "summary": "Crashes",
            "reasoning": "Stack trace",
            "isTriaged": true
        })));
        let client = ClassificationClient::new(provider.clone());

        let result = client.classify(&prompt()).await.unwrap();

        assert!(result.is_likely_a_bug);
        assert!(result.is_triaged, "client returns raw output; callers normalize");
        let call = &provider.get_calls()[0];
        assert!(call.json_reply);
        assert_eq!(call.temperature, 0.0);
        assert_eq!(call.operation, "triage");
        assert_eq!(call.input, "Issue Title: Crash");
        assert!(call.instructions.starts_with("You triage issues."));
        assert!(call.instructions.contains("ClassificationResult"));
        assert!(call.instructions.contains("isLikelyAFeatureRequest"));
    }

    #[tokio::test]
    async fn classify_ignores_badly_typed_echoed_fields() {
        let provider = Arc::new(MockAIProvider::new().with_json_response(json!({
            "id": "issue-42",
            "isTriaged": null,
            "isLikelyABug": true,
            "summary": "Crashes",
            "reasoning": "Stack trace"
        })));
        let client = ClassificationClient::new(provider);

        let result = client.classify(&prompt()).await.unwrap();

        assert!(result.is_likely_a_bug);
        assert_eq!(result.id, None);
        assert!(!result.is_triaged);
    }

    #[tokio::test]
    async fn classify_accepts_fenced_reply() {
        let provider = Arc::new(
            MockAIProvider::new().with_response("```json\n{\"isHowToQuestion\": true}\n```"),
        );
        let client = ClassificationClient::new(provider);

        let result = client.classify(&prompt()).await.unwrap();

        assert!(result.is_how_to_question);
    }

    #[tokio::test]
    async fn unparsable_reply_is_malformed() {
        let provider = Arc::new(MockAIProvider::new().with_response("I think it's a bug"));
        let client = ClassificationClient::new(provider);

        let err = client.classify(&prompt()).await.unwrap_err();

        assert!(matches!(err, ClassificationError::Malformed(_)));
    }

    #[tokio::test]
    async fn truncated_reply_says_so() {
        let provider = Arc::new(MockAIProvider::new().with_truncated_response("{\"isLikelyA"));
        let client = ClassificationClient::new(provider).with_max_tokens(8);

        let err = client.classify(&prompt()).await.unwrap_err();

        let ClassificationError::Malformed(reason) = err else {
            panic!("expected a malformed reply");
        };
        assert!(reason.starts_with("reply cut off at the token limit"));
    }

    #[tokio::test]
    async fn blank_reply_is_empty_response() {
        let provider = Arc::new(MockAIProvider::new().with_response("   "));
        let client = ClassificationClient::new(provider);

        let err = client.classify(&prompt()).await.unwrap_err();

        assert!(matches!(err, ClassificationError::EmptyResponse));
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped() {
        let provider = Arc::new(MockAIProvider::new().with_error(AIError::Timeout(60)));
        let client = ClassificationClient::new(provider);

        let err = client.classify(&prompt()).await.unwrap_err();

        assert!(matches!(err, ClassificationError::Provider(_)));
    }

    #[tokio::test]
    async fn suggest_accepts_bare_and_wrapped_lists() {
        let item = json!({ "areaLabel": "area-docs", "reasoning": "docs", "confidence": 0.9 });
        let provider = Arc::new(
            MockAIProvider::new()
                .with_json_response(json!([item.clone()]))
                .with_json_response(json!({ "suggestions": [item] })),
        );
        let client = ClassificationClient::new(provider);

        let bare = client.suggest(&prompt()).await.unwrap();
        let wrapped = client.suggest(&prompt()).await.unwrap();

        assert_eq!(bare, wrapped);
        assert_eq!(bare[0].area_label, "area-docs");
    }
}
