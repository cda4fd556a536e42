//! Adapters - Implementations of port interfaces.
//!
//! - `ai` - OpenAI provider, mock provider and the structured-output client
//! - `tracker` - GitHub REST tracker and an in-memory tracker
//! - `store` - In-memory, PostgreSQL and issues REST API stores

pub mod ai;
mod retry;
pub mod store;
pub mod tracker;

pub use ai::{ClassificationClient, MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use store::{InMemoryIssueStore, IssuesApiConfig, IssuesApiStore, PostgresIssueStore};
pub use tracker::{GithubTracker, GithubTrackerConfig, InMemoryTracker, TrackerMutation};
