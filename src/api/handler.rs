//! API Lambda handler - thin router in front of the command and callback
//! handlers.
//!
//! This module handles:
//! - CORS preflight
//! - API key and callback signature checks
//! - Event classification (chat command vs. workflow callback)
//! - Construction of the production collaborators

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use super::{callback_handler, command_handler, helpers, parsing, signature};
use crate::ai::{LlmSummarizer, Summarizer};
use crate::clients::{GitHubWorkflowTrigger, WorkflowTrigger};
use crate::core::config::RelayConfig;
use crate::core::models::RelayEvent;
use crate::core::secrets::RelaySecrets;
use crate::errors::RelayError;
use crate::telegram::{ChatSender, TelegramClient};

pub use self::function_handler as handler;

/// External collaborators for one request.
pub struct Collaborators<'a> {
    pub sender: &'a dyn ChatSender,
    pub summarizer: Option<&'a dyn Summarizer>,
    pub trigger: Option<&'a dyn WorkflowTrigger>,
}

/// Lambda handler for the relay entrypoint.
///
/// # Errors
///
/// Missing configuration is fatal and returned to the runtime; every other
/// failure is answered with an HTTP error payload.
#[tracing::instrument(level = "info", skip(event))]
pub async fn function_handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let payload = event.payload;

    if parsing::request_method(&payload).is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS")) {
        return Ok(helpers::preflight());
    }

    let config = RelayConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;
    let secrets = RelaySecrets::load().await.map_err(|e| {
        error!("Secrets error: {}", e);
        Error::from(e)
    })?;

    let sender = TelegramClient::new(secrets.telegram_bot_token.clone());
    let summarizer = build_summarizer(&config, &secrets).map_err(Error::from)?;
    let trigger = build_trigger(&config, &secrets);

    let collaborators = Collaborators {
        sender: &sender,
        summarizer: summarizer.as_ref().map(|s| s as &dyn Summarizer),
        trigger: trigger.as_ref().map(|t| t as &dyn WorkflowTrigger),
    };

    handle_request(&config, &secrets, &payload, &collaborators)
        .await
        .map_err(|e| {
            error!("Fatal request error: {}", e);
            Error::from(e)
        })
}

/// # Errors
///
/// Returns `ConfigurationMissing` when AI is enabled without an API key.
pub fn build_summarizer(
    config: &RelayConfig,
    secrets: &RelaySecrets,
) -> Result<Option<LlmSummarizer>, RelayError> {
    if !config.ai_enabled {
        return Ok(None);
    }
    let api_key = secrets.openai_api_key.clone().ok_or_else(|| {
        RelayError::ConfigurationMissing("OPENAI_API_KEY is required when AI is enabled".to_string())
    })?;
    let model = config.ai_model_id.clone().ok_or_else(|| {
        RelayError::ConfigurationMissing("AI_MODEL_ID is required when AI is enabled".to_string())
    })?;
    Ok(Some(LlmSummarizer::new(
        api_key,
        config.openai_base_url.clone(),
        model,
        config.summarizer_max_output_tokens,
    )))
}

#[must_use]
pub fn build_trigger(config: &RelayConfig, secrets: &RelaySecrets) -> Option<GitHubWorkflowTrigger> {
    match (&secrets.github_token, &config.github_repository) {
        (Some(token), Some(repo)) => Some(GitHubWorkflowTrigger::new(token.clone(), repo.clone())),
        _ => None,
    }
}

/// Routes one API Gateway payload.
///
/// # Errors
///
/// Only `ConfigurationMissing` escapes; other failures become error responses.
pub async fn handle_request(
    config: &RelayConfig,
    secrets: &RelaySecrets,
    payload: &Value,
    collaborators: &Collaborators<'_>,
) -> Result<Value, RelayError> {
    if parsing::request_method(payload).is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS")) {
        return Ok(helpers::preflight());
    }

    let headers = payload.get("headers").unwrap_or(&Value::Null);

    if let Err(e) = verify_api_key(headers, secrets) {
        error!("{}", e);
        return Ok(helpers::err_response(403, "Forbidden"));
    }

    let body = match parsing::request_body(payload) {
        Ok(b) => b,
        Err(e) => {
            error!("Invalid request: {}", e);
            return Ok(helpers::err_response(400, &e.to_string()));
        }
    };

    let event = match parsing::parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            error!("Failed to parse event: {}", e);
            return Ok(helpers::err_response(400, &format!("Parse Error: {e}")));
        }
    };

    match event {
        RelayEvent::Ignored(reason) => {
            info!(reason = %reason, "Ignoring update");
            Ok(helpers::ok_empty())
        }
        RelayEvent::WorkflowCallback(callback) => {
            if let Err(e) = verify_callback(&body, headers, secrets) {
                error!("{}", e);
                return Ok(helpers::err_response(401, &e.to_string()));
            }
            info!(
                correlation_id = %callback.correlation_id,
                command = %callback.command_kind,
                "Received workflow callback"
            );
            Ok(callback_handler::handle_workflow_callback(
                config,
                callback,
                collaborators.summarizer,
                collaborators.sender,
            )
            .await)
        }
        RelayEvent::ChatCommand(command) => {
            match command_handler::handle_chat_command(
                config,
                &command,
                collaborators.sender,
                collaborators.trigger,
            )
            .await
            {
                Ok(response) => Ok(response),
                Err(e @ RelayError::ConfigurationMissing(_)) => Err(e),
                Err(e) => {
                    error!("Chat command failed: {}", e);
                    Ok(helpers::err_response(502, &e.to_string()))
                }
            }
        }
    }
}

// ============================================================================
// Request Validation Helpers
// ============================================================================

fn verify_api_key(headers: &Value, secrets: &RelaySecrets) -> Result<(), RelayError> {
    let Some(expected) = secrets.api_gateway_key.as_deref() else {
        return Ok(());
    };
    match parsing::get_header_value(headers, "x-api-key") {
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(RelayError::Unauthorized("invalid x-api-key header".to_string())),
        None => Err(RelayError::Unauthorized("missing x-api-key header".to_string())),
    }
}

fn verify_callback(body: &str, headers: &Value, secrets: &RelaySecrets) -> Result<(), RelayError> {
    let Some(secret) = secrets.callback_signing_secret.as_deref() else {
        return Ok(());
    };

    let Some(sig) = parsing::get_header_value(headers, "X-Relay-Signature") else {
        return Err(RelayError::Unauthorized(
            "Missing X-Relay-Signature header".to_string(),
        ));
    };

    let Some(timestamp) = parsing::get_header_value(headers, "X-Relay-Timestamp") else {
        return Err(RelayError::Unauthorized(
            "Missing X-Relay-Timestamp header".to_string(),
        ));
    };

    if !signature::verify_callback_signature(body, timestamp, sig, secret) {
        return Err(RelayError::Unauthorized(
            "Invalid callback signature".to_string(),
        ));
    }

    Ok(())
}
