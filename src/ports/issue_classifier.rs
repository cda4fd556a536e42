//! Classification ports.
//!
//! Structured-output contracts over a language model. The triage engine asks
//! for a [`ClassificationResult`]; the area-label command asks for a list of
//! [`AreaLabelSuggestion`]s. Both are satisfied by
//! `adapters::ai::ClassificationClient`.

use async_trait::async_trait;

use super::ai_provider::AIError;
use crate::domain::issue::{AreaLabelSuggestion, ClassificationResult};

/// A prompt plus the JSON shape the reply must follow.
#[derive(Debug, Clone)]
pub struct StructuredPrompt {
    /// Instructions for the model.
    pub system: String,
    /// The material to classify.
    pub user: String,
    /// Human-readable name of the expected shape.
    pub shape_name: String,
    /// JSON schema of the expected reply.
    pub schema: serde_json::Value,
}

impl StructuredPrompt {
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        shape_name: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            shape_name: shape_name.into(),
            schema,
        }
    }
}

/// Classifies a single issue.
#[async_trait]
pub trait IssueClassifier: Send + Sync {
    async fn classify(
        &self,
        prompt: &StructuredPrompt,
    ) -> Result<ClassificationResult, ClassificationError>;
}

/// Suggests area labels for a single issue.
#[async_trait]
pub trait AreaLabelSuggester: Send + Sync {
    async fn suggest(
        &self,
        prompt: &StructuredPrompt,
    ) -> Result<Vec<AreaLabelSuggestion>, ClassificationError>;
}

/// Classification errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// The model provider failed (timeout, API error, rate limit).
    #[error("model provider failed: {0}")]
    Provider(#[from] AIError),

    /// The reply did not match the expected shape.
    #[error("malformed model output: {0}")]
    Malformed(String),

    /// The reply had no content.
    #[error("model returned an empty response")]
    EmptyResponse,
}
