//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `IssueStore` - Persistence of tracked issues
//! - `IssueTracker` - Upstream issue tracker reads and mutations
//! - `AIProvider` - Chat completion provider
//! - `IssueClassifier` / `AreaLabelSuggester` - Structured model output

mod ai_provider;
mod issue_classifier;
mod issue_store;
mod issue_tracker;

pub use ai_provider::{AIError, AIProvider, CompletionRequest, CompletionResponse, TokenUsage};
pub use issue_classifier::{
    AreaLabelSuggester, ClassificationError, IssueClassifier, StructuredPrompt,
};
pub use issue_store::{IssueStore, Page, StoreError, DEFAULT_LIST_ALL_PAGE_SIZE};
pub use issue_tracker::{IssueTracker, TrackerError};
