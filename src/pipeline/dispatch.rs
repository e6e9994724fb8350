//! Routing decision and the per-event processing pipeline.

use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::ai::Summarizer;
use crate::ai::prompt_builder;
use crate::core::config::RelayConfig;
use crate::core::models::{CommandKind, ExtractedSummary, RawOutput, RenderedMessage};
use crate::errors::SummarizerError;
use crate::processing::{extract, normalize, simple_formatter};
use crate::telegram::renderer::{compose_summary, render};

/// Where an event's output is sent after `Received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Ai,
    Simple,
    PassThrough,
}

/// Pure routing rule.
///
/// The AI threshold is exclusive: output of exactly `ai_threshold` characters
/// does not go to the summarizer. The same holds for the simple threshold.
#[must_use]
pub fn decide_route(output: &RawOutput, config: &RelayConfig) -> Route {
    let len = output.char_len();
    let bypass = config.confirm_destroy_bypass_threshold
        && output.command_kind == CommandKind::ConfirmDestroy;

    if config.ai_enabled && (bypass || len > config.ai_threshold) {
        Route::Ai
    } else if len > config.simple_threshold {
        Route::Simple
    } else {
        Route::PassThrough
    }
}

/// Result of one pass through the pipeline.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub route: Route,
    /// Set when the AI route failed and the simple formatter took over.
    pub fallback: Option<SummarizerError>,
    /// Only present when the AI route succeeded.
    pub summary: Option<ExtractedSummary>,
    pub message: RenderedMessage,
}

impl DispatchOutcome {
    /// Route whose formatter actually produced the message.
    #[must_use]
    pub fn effective_route(&self) -> Route {
        if self.fallback.is_some() {
            Route::Simple
        } else {
            self.route
        }
    }
}

/// Runs one event through routing, summarization or formatting, and rendering.
pub struct Dispatcher<'a> {
    config: &'a RelayConfig,
    summarizer: Option<&'a dyn Summarizer>,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(config: &'a RelayConfig, summarizer: Option<&'a dyn Summarizer>) -> Self {
        Self { config, summarizer }
    }

    /// Never fails: every summarizer error degrades to the simple formatter.
    pub async fn process(&self, output: &RawOutput) -> DispatchOutcome {
        let route = decide_route(output, self.config);
        info!(
            command = %output.command_kind,
            chars = output.char_len(),
            route = ?route,
            "Routing workflow output"
        );

        match route {
            Route::PassThrough => DispatchOutcome {
                route,
                fallback: None,
                summary: None,
                message: self.render(&output.text),
            },
            Route::Simple => DispatchOutcome {
                route,
                fallback: None,
                summary: None,
                message: self.render_simple(output),
            },
            Route::Ai => match self.summarize(output).await {
                Ok((summary, message)) => DispatchOutcome {
                    route,
                    fallback: None,
                    summary: Some(summary),
                    message,
                },
                Err(e) => {
                    warn!(error = %e, "AI summarization failed, using simple formatter");
                    DispatchOutcome {
                        route,
                        fallback: Some(e),
                        summary: None,
                        message: self.render_simple(output),
                    }
                }
            },
        }
    }

    async fn summarize(
        &self,
        output: &RawOutput,
    ) -> Result<(ExtractedSummary, RenderedMessage), SummarizerError> {
        let summarizer = self.summarizer.ok_or_else(|| {
            SummarizerError::ServiceUnavailable("no summarizer configured".to_string())
        })?;

        let sections = normalize(&output.text);
        let prompt = prompt_builder::build(
            &sections,
            output.command_kind,
            self.config.prompt_max_chars,
        );
        info!(
            sections = sections.len(),
            prompt_chars = prompt.chars().count(),
            "Built summarizer prompt"
        );

        let text = timeout(self.config.summarizer_timeout, summarizer.summarize(&prompt))
            .await
            .map_err(|_| {
                SummarizerError::ServiceUnavailable(format!(
                    "timed out after {}s",
                    self.config.summarizer_timeout.as_secs()
                ))
            })??;

        let summary = extract(&sections, output.command_kind);
        let content = compose_summary(
            &summary,
            output.command_kind,
            &text,
            self.config.message_format,
        );
        Ok((summary, self.render(&content)))
    }

    fn render_simple(&self, output: &RawOutput) -> RenderedMessage {
        self.render(&simple_formatter::format(
            &output.text,
            self.config.simple_format_max_chars,
        ))
    }

    fn render(&self, content: &str) -> RenderedMessage {
        render(
            content,
            self.config.message_format,
            self.config.max_message_length,
        )
    }
}
