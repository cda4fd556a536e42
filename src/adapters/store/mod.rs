//! Issue store adapters.

mod in_memory;
mod issues_api;
mod postgres;

pub use in_memory::InMemoryIssueStore;
pub use issues_api::{IssuesApiConfig, IssuesApiStore};
pub use postgres::{PostgresIssueStore, SCHEMA};
