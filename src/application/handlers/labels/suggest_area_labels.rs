//! SuggestAreaLabelsHandler - asks the model which area labels fit an issue.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::domain::issue::{AreaLabelCatalogue, AreaLabelSuggestion};
use crate::ports::{AreaLabelSuggester, IssueTracker, StructuredPrompt, TrackerError};

/// The issue as the model sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AreaLabelRequest<'a> {
    title: &'a str,
    description: &'a str,
    comments: Vec<&'a str>,
}

/// Builds the suggestion prompt for one issue.
pub fn build_area_label_prompt(
    repository: &str,
    catalogue: &AreaLabelCatalogue,
    title: &str,
    description: &str,
    comments: &[&str],
) -> StructuredPrompt {
    let system = format!(
        "You are an AI assistant that suggests area labels for GitHub issues in the {repository} repository. \
         Suggest a collection of area labels for the issue based on its title, description and comments.\n\
         Each area label must be one of the following (JSON with label name and description):\n\
         {labels}\n\n\
         You will receive the issue as JSON with the fields title, description and comments.\n\
         Reply with a JSON array of objects with these fields:\n\
         - areaLabel: the suggested area label.\n\
         - reasoning: a brief explanation of why you chose it.\n\
         - confidence: a score from 0 (not confident at all) to 1 (fully confident).",
        labels = catalogue.to_prompt_json()
    );

    let request = AreaLabelRequest {
        title,
        description,
        comments: comments.to_vec(),
    };
    let issue_json = serde_json::to_string(&request).unwrap_or_else(|_| "{}".to_string());
    let user = format!(
        "Help me suggest the best area labels for the following GitHub issue (serialized as json):\n{issue_json}"
    );

    StructuredPrompt::new(system, user, "AreaLabelSuggestion[]", suggestions_schema())
}

fn suggestions_schema() -> serde_json::Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "areaLabel": { "type": "string" },
                "reasoning": { "type": "string" },
                "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
            },
            "required": ["areaLabel", "reasoning", "confidence"]
        }
    })
}

/// Handler for the area label suggestion query.
pub struct SuggestAreaLabelsHandler {
    tracker: Arc<dyn IssueTracker>,
    suggester: Arc<dyn AreaLabelSuggester>,
    catalogue: AreaLabelCatalogue,
    repository: String,
}

impl SuggestAreaLabelsHandler {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        suggester: Arc<dyn AreaLabelSuggester>,
        catalogue: AreaLabelCatalogue,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            suggester,
            catalogue,
            repository: repository.into(),
        }
    }

    /// Returns catalogued suggestions for issue `number`, best first.
    ///
    /// Tracker failures are returned. A model failure is logged and yields an
    /// empty list.
    pub async fn handle(&self, number: u64) -> Result<Vec<AreaLabelSuggestion>, TrackerError> {
        let issue = self.tracker.get_issue(number).await?;
        let comments = self.tracker.get_comments(number).await?;
        let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();

        let prompt = build_area_label_prompt(
            &self.repository,
            &self.catalogue,
            &issue.title,
            issue.body.as_deref().unwrap_or_default(),
            &bodies,
        );

        match self.suggester.suggest(&prompt).await {
            Ok(suggestions) => {
                let kept = self.catalogue.filter_suggestions(suggestions);
                tracing::debug!(number, suggestions = kept.len(), "area labels suggested");
                Ok(kept)
            }
            Err(err) => {
                tracing::error!(number, error = %err, "Error getting area label suggestion");
                Ok(Vec::new())
            }
        }
    }
}
