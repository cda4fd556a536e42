//! Triage Sync - AI-assisted issue triage kept in step with an upstream tracker.
//!
//! Untriaged issues on the watched repository are classified by a language
//! model and stored as tracked issues. A second pass keeps the tracked rows
//! aligned with upstream: rows for issues that were closed or triaged by a
//! human are removed, and title, labels, milestone, upvotes and number are
//! refreshed on the rest.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
