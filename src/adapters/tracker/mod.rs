//! Issue tracker adapters.

mod github;
mod github_wire;
mod in_memory;

pub use github::{GithubTracker, GithubTrackerConfig};
pub use in_memory::{InMemoryTracker, TrackerMutation};
