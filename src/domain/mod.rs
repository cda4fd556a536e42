//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors)
//! - `issue` - Tracked issues, upstream snapshots, diffs and sync plans

pub mod foundation;
pub mod issue;
