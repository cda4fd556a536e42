//! Area label catalogue and model suggestions.

use serde::{Deserialize, Serialize};

/// A label that assigns an issue to an owning area of the codebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaLabel {
    pub name: String,
    pub description: String,
}

impl AreaLabel {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A model's suggestion of one area label for an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaLabelSuggestion {
    pub area_label: String,
    #[serde(default)]
    pub reasoning: String,
    /// 0 = not confident at all, 1 = fully confident.
    #[serde(default)]
    pub confidence: f64,
}

/// The set of area labels suggestions may draw from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaLabelCatalogue(Vec<AreaLabel>);

impl AreaLabelCatalogue {
    pub fn new(labels: Vec<AreaLabel>) -> Self {
        Self(labels)
    }

    pub fn labels(&self) -> &[AreaLabel] {
        &self.0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|label| label.name == name)
    }

    /// Keeps suggestions naming catalogued labels, clamps confidence into
    /// `[0, 1]` and orders by confidence, highest first.
    pub fn filter_suggestions(
        &self,
        suggestions: Vec<AreaLabelSuggestion>,
    ) -> Vec<AreaLabelSuggestion> {
        let mut kept: Vec<AreaLabelSuggestion> = suggestions
            .into_iter()
            .filter(|s| self.contains(&s.area_label))
            .map(|mut s| {
                s.confidence = if s.confidence.is_nan() {
                    0.0
                } else {
                    s.confidence.clamp(0.0, 1.0)
                };
                s
            })
            .collect();
        kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        kept
    }

    /// Serializes the catalogue as pretty JSON for embedding in prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for AreaLabelCatalogue {
    fn default() -> Self {
        Self(vec![
            AreaLabel::new("area-docs", "Issues related to missing/wrong documentation or guides."),
            AreaLabel::new("area-samples", "Issues related to wrong and/or missing sample."),
            AreaLabel::new(
                "area-dashboard",
                "Issues related to the dashboard or something related to the User Interface.",
            ),
            AreaLabel::new(
                "area-acquisition",
                "Issues related to installing the product, or getting its templates.",
            ),
            AreaLabel::new(
                "area-meta",
                "Issues related to packages shipped by the repository and their dependencies, \
                 especially issues that are generalized to all the packages that are shipped.",
            ),
            AreaLabel::new(
                "area-app-model",
                "Issues pertaining to the hosting APIs used to model applications which are \
                 then orchestrated, including the app host.",
            ),
            AreaLabel::new(
                "area-app-testing",
                "Issues pertaining to the testing APIs and running tests for user applications.",
            ),
            AreaLabel::new(
                "area-deployment",
                "Issues related to deploying applications to any target environment.",
            ),
            AreaLabel::new(
                "area-engineering-systems",
                "Repo-specific issues, e.g. CI/CD, pipelines, disabled tests, etc.",
            ),
            AreaLabel::new(
                "area-integrations",
                "Issues related to integrating with other systems, e.g. message buses, storage, etc.",
            ),
            AreaLabel::new(
                "area-orchestrator",
                "Issues related to the orchestrator which launches projects and containers.",
            ),
            AreaLabel::new(
                "area-service-discovery",
                "Issues related to service discovery libraries and logic.",
            ),
            AreaLabel::new(
                "area-telemetry",
                "Issues related to logging, telemetry, and traces sent to the collector and \
                 displayed in the dashboard.",
            ),
            AreaLabel::new(
                "area-templates",
                "Issues related to the project templates and their documentation.",
            ),
            AreaLabel::new(
                "area-tooling",
                "Issues related to IDEs, editors, or similar tooling used to develop applications.",
            ),
        ])
    }
}
