//! Chat commands typed by an operator.
//!
//! Infrastructure commands start the workflow and acknowledge immediately;
//! the actual result arrives later through the callback route.

use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::helpers;
use crate::clients::WorkflowTrigger;
use crate::core::config::RelayConfig;
use crate::core::models::{ChatCommandEvent, CommandKind};
use crate::errors::RelayError;
use crate::telegram::{ChatSender, render};

pub const HELP_TEXT: &str = "*ChatOps relay*\n\
`/status` - show the current infrastructure state\n\
`/destroy` - plan a destroy (nothing is removed)\n\
`/confirm_destroy` - actually destroy the infrastructure\n\
`/help` - show this message";

fn acknowledgement(command: CommandKind) -> &'static str {
    match command {
        CommandKind::Status => "Checking infrastructure status...",
        CommandKind::Destroy => {
            "Planning destroy. Nothing will be removed until you send `/confirm_destroy`."
        }
        CommandKind::ConfirmDestroy => "Destroying infrastructure. This can take a few minutes.",
    }
}

async fn reply(
    config: &RelayConfig,
    sender: &dyn ChatSender,
    chat_id: &str,
    text: &str,
) -> Result<(), RelayError> {
    let message = render(text, config.message_format, config.max_message_length);
    sender.send_message(chat_id, &message).await?;
    Ok(())
}

/// Handles one chat command.
///
/// # Errors
///
/// Returns `ConfigurationMissing` when an infrastructure command arrives but no
/// workflow trigger is configured, and `Delivery` when the chat reply fails.
#[tracing::instrument(level = "info", skip_all, fields(chat_id = %event.chat_id, command = %event.command))]
pub async fn handle_chat_command(
    config: &RelayConfig,
    event: &ChatCommandEvent,
    sender: &dyn ChatSender,
    trigger: Option<&dyn WorkflowTrigger>,
) -> Result<Value, RelayError> {
    if !config.is_chat_authorized(&event.chat_id) {
        warn!("Rejected command from unauthorized chat");
        return Ok(helpers::err_response(403, "Chat not authorized"));
    }

    let Some(command) = CommandKind::parse(&event.command) else {
        info!("Replying with help text");
        reply(config, sender, &event.chat_id, HELP_TEXT).await?;
        return Ok(helpers::ok_json(&json!({ "ok": true, "command": "help" })));
    };

    let trigger = trigger.ok_or_else(|| {
        RelayError::ConfigurationMissing("GitHub token and GITHUB_REPOSITORY".to_string())
    })?;

    let correlation_id = Uuid::new_v4().to_string();
    if let Err(e) = trigger.trigger(command, &event.chat_id, &correlation_id).await {
        error!(correlation_id = %correlation_id, "Workflow trigger failed: {}", e);
        reply(
            config,
            sender,
            &event.chat_id,
            "Failed to start the workflow. Please try again later.",
        )
        .await?;
        return Ok(helpers::err_response(502, &e.to_string()));
    }

    info!(correlation_id = %correlation_id, "Workflow triggered");
    reply(config, sender, &event.chat_id, acknowledgement(command)).await?;
    Ok(helpers::ok_json(&json!({
        "ok": true,
        "command": command.as_str(),
        "correlation_id": correlation_id,
    })))
}
