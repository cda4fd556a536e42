//! Tracked issue record - the persisted triage result for one upstream issue.
//!
//! # Ownership of fields
//!
//! | Fields | Written by |
//! |--------|------------|
//! | `id` | issue store, on create |
//! | `title`, `url`, `number`, `milestone`, `labels`, `upvotes` | upstream tracker |
//! | classification flags, `summary`, `reasoning` | classification model |
//! | `is_triaged` | nobody; always false for machine-created rows |

use serde::{Deserialize, Serialize};

use super::classification::ClassificationResult;
use super::upstream_issue::UpstreamIssue;
use crate::domain::foundation::IssueId;

/// Label prefix used for area (component ownership) labels.
pub const AREA_LABEL_PREFIX: &str = "area-";

/// Persisted record of an untriaged issue and its machine classification.
///
/// # Invariants
///
/// - `url` is unique among tracked issues
/// - `id` is `None` until the store assigns one and never changes afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackedIssue {
    /// Store-assigned identifier.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_issue_id"
    )]
    pub id: Option<IssueId>,
    pub title: String,
    /// Canonical upstream URL (natural key).
    pub url: String,
    pub number: u64,
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub is_how_to_question: bool,
    #[serde(default)]
    pub is_likely_a_bug: bool,
    #[serde(default)]
    pub is_likely_a_feature_request: bool,
    #[serde(default)]
    pub is_triaged: bool,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl TrackedIssue {
    /// Builds an unsaved record from an upstream issue and its classification.
    ///
    /// Identity fields always come from the upstream issue. The classification
    /// is normalized first, so the record never carries an id or a triaged flag.
    pub fn from_classification(upstream: &UpstreamIssue, result: ClassificationResult) -> Self {
        let result = result.normalized();
        Self {
            id: None,
            title: upstream.title.clone(),
            url: upstream.url.clone(),
            number: upstream.number,
            milestone: upstream.milestone.clone(),
            labels: upstream.labels.clone(),
            upvotes: upstream.upvotes,
            is_how_to_question: result.is_how_to_question,
            is_likely_a_bug: result.is_likely_a_bug,
            is_likely_a_feature_request: result.is_likely_a_feature_request,
            is_triaged: false,
            summary: result.summary,
            reasoning: result.reasoning,
        }
    }

    /// Copies the upstream-owned fields from `upstream`.
    ///
    /// Classification fields and `is_triaged` are left untouched.
    pub fn apply_upstream(&mut self, upstream: &UpstreamIssue) {
        self.title = upstream.title.clone();
        self.labels = upstream.labels.clone();
        self.milestone = upstream.milestone.clone();
        self.upvotes = upstream.upvotes;
        self.number = upstream.number;
    }

    /// Returns a copy carrying the given store id.
    pub fn with_id(mut self, id: IssueId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns true if any label is an area label.
    pub fn has_area_labels(&self) -> bool {
        self.labels
            .iter()
            .any(|label| label.starts_with(AREA_LABEL_PREFIX))
    }
}

/// Accepts `null`, a missing field, `0` (the REST API's "unset") or a positive id.
fn deserialize_issue_id<'de, D>(deserializer: D) -> Result<Option<IssueId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    match raw {
        None | Some(0) => Ok(None),
        Some(value) => IssueId::new(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
