//! Outbound clients for collaborators other than the chat surface.

pub mod github_client;

pub use github_client::{GitHubWorkflowTrigger, WorkflowTrigger};
