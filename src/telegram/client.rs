//! Telegram Bot API client module
//!
//! Chat delivery boundary. Transient failures (network, short rate limits) are
//! retried here; everything else is reported to the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};

use crate::core::models::{MessageFormat, RenderedMessage};
use crate::errors::DeliveryError;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const MAX_RETRY_AFTER_SECS: u64 = 5;

/// Seam for the chat surface.
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// # Errors
    ///
    /// Returns a `DeliveryError` when the message could not be delivered.
    async fn send_message(
        &self,
        chat_id: &str,
        message: &RenderedMessage,
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Telegram Bot API client with retry logic and error handling
pub struct TelegramClient {
    token: String,
    api_base: String,
    http: Client,
}

impl TelegramClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self::with_api_base(token, TELEGRAM_API_BASE.to_string())
    }

    #[must_use]
    pub fn with_api_base(token: String, api_base: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, DeliveryError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, DeliveryError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(200).map(jitter).take(3);

        RetryIf::spawn(strategy, operation, |e: &DeliveryError| match e {
            DeliveryError::RateLimited { retry_after_secs } => {
                *retry_after_secs <= MAX_RETRY_AFTER_SECS
            }
            other => other.is_transient(),
        })
        .await
    }

    async fn post_send_message(&self, payload: &Value) -> Result<(), DeliveryError> {
        let resp = self
            .http
            .post(format!("{}/bot{}/sendMessage", self.api_base, self.token))
            .json(payload)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        classify_response(status, &body)
    }
}

#[async_trait]
impl ChatSender for TelegramClient {
    async fn send_message(
        &self,
        chat_id: &str,
        message: &RenderedMessage,
    ) -> Result<(), DeliveryError> {
        let payload = build_send_message_payload(chat_id, &message.text, message.format);
        let result = self.with_retry(|| self.post_send_message(&payload)).await;

        match result {
            // Telegram rejected our entities; the text itself is still deliverable.
            Err(DeliveryError::Rejected(reason))
                if message.format != MessageFormat::Plain && reason.contains("parse entities") =>
            {
                warn!(chat_id = %chat_id, "Telegram rejected markup, resending as plain text");
                let plain = build_send_message_payload(chat_id, &message.text, MessageFormat::Plain);
                self.with_retry(|| self.post_send_message(&plain)).await
            }
            Ok(()) => {
                info!(chat_id = %chat_id, truncated = message.truncated, "Message delivered");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Body for `sendMessage`; plain text omits `parse_mode`.
#[must_use]
pub fn build_send_message_payload(chat_id: &str, text: &str, format: MessageFormat) -> Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": text,
        "disable_web_page_preview": true,
    });
    if let Some(mode) = format.parse_mode() {
        payload["parse_mode"] = Value::String(mode.to_string());
    }
    payload
}

/// Maps a Bot API response onto the delivery contract.
///
/// # Errors
///
/// Returns `RateLimited` for 429, `InvalidDestination` for unknown or blocked
/// chats, `Network` for 5xx and `Rejected` for anything else that failed.
pub fn classify_response(status: u16, body: &str) -> Result<(), DeliveryError> {
    let parsed: Option<TelegramResponse> = serde_json::from_str(body).ok();
    if (200..300).contains(&status) && parsed.as_ref().is_some_and(|r| r.ok) {
        return Ok(());
    }

    let code = parsed.as_ref().and_then(|r| r.error_code).unwrap_or(status);
    let description = parsed
        .as_ref()
        .and_then(|r| r.description.clone())
        .unwrap_or_else(|| format!("status {status}"));

    match code {
        429 => Err(DeliveryError::RateLimited {
            retry_after_secs: parsed
                .and_then(|r| r.parameters)
                .and_then(|p| p.retry_after)
                .unwrap_or(1),
        }),
        403 => Err(DeliveryError::InvalidDestination(description)),
        400 if description.contains("chat not found") => {
            Err(DeliveryError::InvalidDestination(description))
        }
        500..=599 => Err(DeliveryError::Network(description)),
        _ => Err(DeliveryError::Rejected(description)),
    }
}
