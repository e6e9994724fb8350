//! Workflow callbacks: run the output through the pipeline and deliver it.

use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::helpers;
use crate::ai::Summarizer;
use crate::core::config::RelayConfig;
use crate::core::models::WorkflowCallbackEvent;
use crate::errors::RelayError;
use crate::pipeline::{DispatchOutcome, Dispatcher};
use crate::telegram::ChatSender;

/// Runs the pipeline for `event` and sends the result to its chat.
///
/// # Errors
///
/// Returns `Delivery` when the chat surface refuses the message. Summarizer
/// failures never surface here.
#[tracing::instrument(level = "info", skip_all, fields(correlation_id = %event.correlation_id))]
pub async fn process_callback(
    config: &RelayConfig,
    event: WorkflowCallbackEvent,
    summarizer: Option<&dyn Summarizer>,
    sender: &dyn ChatSender,
) -> Result<DispatchOutcome, RelayError> {
    let output = event.into_raw_output();
    let outcome = Dispatcher::new(config, summarizer).process(&output).await;

    if let Some(reason) = &outcome.fallback {
        warn!(reason = %reason, "Delivered simple formatting in place of AI summary");
    }

    sender
        .send_message(&output.origin_chat_id, &outcome.message)
        .await?;
    info!(
        route = ?outcome.effective_route(),
        truncated = outcome.message.truncated,
        "Workflow output delivered"
    );
    Ok(outcome)
}

/// API response for a callback: 200 with the route taken, 403 for chats
/// outside the allow list, 502 when delivery failed.
pub async fn handle_workflow_callback(
    config: &RelayConfig,
    event: WorkflowCallbackEvent,
    summarizer: Option<&dyn Summarizer>,
    sender: &dyn ChatSender,
) -> Value {
    if !config.is_chat_authorized(&event.chat_id) {
        warn!(chat_id = %event.chat_id, "Rejected callback for unauthorized chat");
        return helpers::err_response(403, "Chat not authorized");
    }

    let correlation_id = event.correlation_id.clone();
    match process_callback(config, event, summarizer, sender).await {
        Ok(outcome) => helpers::ok_json(&json!({
            "ok": true,
            "route": outcome.effective_route(),
            "truncated": outcome.message.truncated,
            "summary": outcome.summary,
            "correlation_id": correlation_id,
        })),
        Err(e) => {
            error!(correlation_id = %correlation_id, "Callback delivery failed: {}", e);
            helpers::err_response(502, &e.to_string())
        }
    }
}
