//! GitHub client module
//!
//! Starts the infrastructure workflow through `repository_dispatch`. The
//! workflow reports back asynchronously through the callback route.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{error, info};

use crate::core::models::CommandKind;
use crate::errors::RelayError;

const GITHUB_API_BASE: &str = "https://api.github.com";
pub const DISPATCH_EVENT_TYPE: &str = "chatops-command";

/// Seam for the workflow-trigger collaborator.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// # Errors
    ///
    /// Returns `TriggerError` if the workflow could not be started.
    async fn trigger(
        &self,
        command: CommandKind,
        chat_id: &str,
        correlation_id: &str,
    ) -> Result<(), RelayError>;
}

pub struct GitHubWorkflowTrigger {
    token: String,
    repository: String,
    api_base: String,
    http: Client,
}

impl GitHubWorkflowTrigger {
    #[must_use]
    pub fn new(token: String, repository: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            token,
            repository,
            api_base: GITHUB_API_BASE.to_string(),
            http,
        }
    }
}

#[async_trait]
impl WorkflowTrigger for GitHubWorkflowTrigger {
    async fn trigger(
        &self,
        command: CommandKind,
        chat_id: &str,
        correlation_id: &str,
    ) -> Result<(), RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("chatops-relay"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let resp = self
            .http
            .post(format!(
                "{}/repos/{}/dispatches",
                self.api_base, self.repository
            ))
            .headers(headers)
            .bearer_auth(&self.token)
            .json(&build_dispatch_payload(command, chat_id, correlation_id))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            error!(
                "repository_dispatch failed: status={} body={} (corr_id={})",
                status, body_text, correlation_id
            );
            return Err(RelayError::TriggerError(format!(
                "GitHub returned {status}"
            )));
        }

        info!(
            "Triggered {} workflow in {} (corr_id={})",
            command, self.repository, correlation_id
        );
        Ok(())
    }
}

#[must_use]
pub fn build_dispatch_payload(command: CommandKind, chat_id: &str, correlation_id: &str) -> Value {
    json!({
        "event_type": DISPATCH_EVENT_TYPE,
        "client_payload": {
            "command": command.as_str(),
            "chat_id": chat_id,
            "correlation_id": correlation_id,
        }
    })
}
