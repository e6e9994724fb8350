//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use chatops_relay::ai::Summarizer;
use chatops_relay::clients::WorkflowTrigger;
use chatops_relay::core::config::RelayConfig;
use chatops_relay::core::models::{CommandKind, RenderedMessage};
use chatops_relay::errors::{DeliveryError, RelayError, SummarizerError};
use chatops_relay::telegram::ChatSender;

/// Summarizer that replays a fixed result and records every prompt.
pub struct ScriptedSummarizer {
    result: Result<String, SummarizerError>,
    delay: Option<Duration>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    pub fn succeeding(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: SummarizerError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn hanging(delay: Duration) -> Self {
        Self {
            result: Ok("too late".to_string()),
            delay: Some(delay),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

/// Chat sender that records deliveries, optionally failing them all.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, RenderedMessage)>>,
    pub fail_with: Option<DeliveryError>,
}

impl RecordingSender {
    pub fn failing(error: DeliveryError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    pub fn messages(&self) -> Vec<(String, RenderedMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send_message(
        &self,
        chat_id: &str,
        message: &RenderedMessage,
    ) -> Result<(), DeliveryError> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), message.clone()));
        Ok(())
    }
}

/// Workflow trigger that records dispatches.
#[derive(Default)]
pub struct RecordingTrigger {
    pub triggered: Mutex<Vec<(CommandKind, String, String)>>,
    pub fail: bool,
}

#[async_trait]
impl WorkflowTrigger for RecordingTrigger {
    async fn trigger(
        &self,
        command: CommandKind,
        chat_id: &str,
        correlation_id: &str,
    ) -> Result<(), RelayError> {
        if self.fail {
            return Err(RelayError::TriggerError("GitHub returned 500".to_string()));
        }
        self.triggered.lock().unwrap().push((
            command,
            chat_id.to_string(),
            correlation_id.to_string(),
        ));
        Ok(())
    }
}

pub fn ai_config() -> RelayConfig {
    RelayConfig {
        ai_enabled: true,
        ai_model_id: Some("gpt-4o-mini".to_string()),
        ..RelayConfig::default()
    }
}

/// Plan-style output with one marker line padded to exactly `len` chars.
pub fn padded_resource_block(marker: &str, len: usize) -> String {
    let mut text = format!("{marker}\n");
    while text.chars().count() + 20 <= len {
        text.push_str("    tags = \"team\"\n");
    }
    while text.chars().count() < len {
        text.insert(text.len() - 1, ' ');
    }
    text
}
