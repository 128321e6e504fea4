//! MergeFlow core library.
//!
//! This crate provides the foundational components for git branch-merge
//! automation: configuration, the git CLI client, branch resolution, the
//! merge workflow engine, and the domain model types shared with the MCP
//! server and CLI front-ends.

pub mod config;
pub mod errors;
pub mod git;
pub mod models;
pub mod workflow;

// Re-exports for convenience.
pub use config::AppConfig;
pub use git::GitCli;
pub use models::{MergeOutcome, MergeRequest};
pub use workflow::MergeEngine;
