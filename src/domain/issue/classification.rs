//! Model-produced classification of an issue.

use serde::{Deserialize, Deserializer, Serialize};

/// Structured output of the classification model.
///
/// Mirrors the AI-derived subset of a tracked issue. The model is also allowed
/// to echo `id` and `isTriaged`; both are discarded by [`normalized`].
///
/// [`normalized`]: ClassificationResult::normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassificationResult {
    /// Identifier echoed by the model. Never trusted.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "echoed_id"
    )]
    pub id: Option<i64>,
    pub is_how_to_question: bool,
    pub is_likely_a_bug: bool,
    pub is_likely_a_feature_request: bool,
    /// Triaged flag echoed by the model. Never trusted.
    #[serde(deserialize_with = "echoed_flag")]
    pub is_triaged: bool,
    pub summary: Option<String>,
    pub reasoning: Option<String>,
}

impl ClassificationResult {
    /// Resets the fields the model must not control and tidies free text.
    pub fn normalized(self) -> Self {
        Self {
            id: None,
            is_triaged: false,
            summary: non_blank(self.summary),
            reasoning: non_blank(self.reasoning),
            ..self
        }
    }

    /// JSON schema describing the shape the model must return.
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "isHowToQuestion": { "type": "boolean" },
                "isLikelyABug": { "type": "boolean" },
                "isLikelyAFeatureRequest": { "type": "boolean" },
                "isTriaged": { "type": "boolean", "const": false },
                "summary": { "type": "string" },
                "reasoning": { "type": "string" }
            },
            "required": [
                "isHowToQuestion",
                "isLikelyABug",
                "isLikelyAFeatureRequest",
                "summary",
                "reasoning"
            ]
        })
    }
}

// `id` and `isTriaged` are reset after decoding, so any JSON value is accepted
// for them and a wrong type decodes as unset.
fn echoed_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?.as_i64())
}

fn echoed_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?
        .as_bool()
        .unwrap_or(false))
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
