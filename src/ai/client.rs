//! LLM (`OpenAI` Responses API) client module
//!
//! Encapsulates the generative-model boundary. Every outcome is returned as a
//! `Result`; nothing here panics or escapes as anything but `SummarizerError`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::SummarizerError;

const MAX_CONTEXT_TOKENS: usize = 128_000;
const TOKEN_BUFFER: usize = 250;
const HTTP_TIMEOUT_SECS: u64 = 30;

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// Seam for the external text-generation capability.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// # Errors
    ///
    /// Returns a `SummarizerError` for every failure; callers fall back to the
    /// simple formatter.
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError>;
}

/// Summarizer backed by an OpenAI-compatible `/responses` endpoint.
pub struct LlmSummarizer {
    api_key: String,
    base_url: String,
    model_name: String,
    max_output_tokens: usize,
    http: Client,
}

impl LlmSummarizer {
    #[must_use]
    pub fn new(
        api_key: String,
        base_url: String,
        model_name: String,
        max_output_tokens: usize,
    ) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name,
            max_output_tokens,
            http,
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model_name,
            "input": [{
                "role": "user",
                "content": [{ "type": "input_text", "text": prompt }]
            }],
            "max_output_tokens": self.max_output_tokens
        })
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        #[cfg(feature = "debug-logs")]
        info!("Using summarizer prompt:\n{}", prompt);

        let estimated_input_tokens = estimate_tokens(prompt);
        info!(
            model = %self.model_name,
            estimated_input_tokens,
            max_output_tokens = self.max_output_tokens,
            "Requesting summary"
        );

        if estimated_input_tokens
            .saturating_add(self.max_output_tokens)
            .saturating_add(TOKEN_BUFFER)
            > MAX_CONTEXT_TOKENS
        {
            return Err(SummarizerError::BudgetExceeded(format!(
                "prompt of ~{estimated_input_tokens} tokens does not fit the context window"
            )));
        }

        let response = self
            .http
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizerError::ServiceUnavailable("request timed out".to_string())
                } else {
                    SummarizerError::ServiceUnavailable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            SummarizerError::ServiceUnavailable(format!("failed to read response body: {e}"))
        })?;

        interpret_response(status, &body)
    }
}

/// Maps an HTTP status and body from the Responses API onto the summarizer
/// contract.
///
/// # Errors
///
/// - `BudgetExceeded` when the context is too long or the model stopped at
///   `max_output_tokens`.
/// - `ServiceUnavailable` for any other non-success status.
/// - `InvalidResponse` when the body is not JSON or carries no text.
pub fn interpret_response(status: u16, body: &str) -> Result<String, SummarizerError> {
    if !(200..300).contains(&status) {
        if body.contains("context_length_exceeded") {
            return Err(SummarizerError::BudgetExceeded(format!(
                "status {status}: context length exceeded"
            )));
        }
        warn!(status, "Summarizer returned an error status");
        return Err(SummarizerError::ServiceUnavailable(format!(
            "status {status}: {}",
            body.chars().take(300).collect::<String>()
        )));
    }

    let json: Value = serde_json::from_str(body)
        .map_err(|e| SummarizerError::InvalidResponse(format!("malformed JSON: {e}")))?;

    let incomplete_reason = json
        .get("incomplete_details")
        .and_then(|d| d.get("reason"))
        .and_then(Value::as_str);
    if json.get("status").and_then(Value::as_str) == Some("incomplete")
        && incomplete_reason == Some("max_output_tokens")
    {
        return Err(SummarizerError::BudgetExceeded(
            "model stopped at max_output_tokens".to_string(),
        ));
    }

    extract_output_text(&json)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| SummarizerError::InvalidResponse("no output text in response".to_string()))
}

/// Text from `output_text`, or the concatenated `output_text` parts of
/// `output[].content[]`.
#[must_use]
pub fn extract_output_text(response_json: &Value) -> Option<String> {
    if let Some(text) = response_json.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let mut collected: Vec<String> = Vec::new();
    if let Some(items) = response_json.get("output").and_then(Value::as_array) {
        for item in items {
            let Some(parts) = item.get("content").and_then(Value::as_array) else {
                continue;
            };
            for p in parts {
                let is_output_text = p
                    .get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t == "output_text");
                if !is_output_text {
                    continue;
                }
                if let Some(s) = p.get("text").and_then(Value::as_str) {
                    collected.push(s.to_string());
                } else if let Some(s) = p
                    .get("text")
                    .and_then(|t| t.get("value"))
                    .and_then(Value::as_str)
                {
                    collected.push(s.to_string());
                }
            }
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_output_text_shortcut() {
        let body = r#"{"status": "completed", "output_text": "3 resources destroyed"}"#;
        assert_eq!(interpret_response(200, body).unwrap(), "3 resources destroyed");
    }

    #[test]
    fn test_interpret_collects_output_parts() {
        let body = r#"{
            "status": "completed",
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "line one"},
                    {"type": "refusal", "text": "ignored"},
                    {"type": "output_text", "text": {"value": "line two"}}
                ]}
            ]
        }"#;
        assert_eq!(interpret_response(200, body).unwrap(), "line one\nline two");
    }

    #[test]
    fn test_interpret_missing_content_is_invalid_response() {
        let body = r#"{"status": "completed", "output": []}"#;
        assert!(matches!(
            interpret_response(200, body),
            Err(SummarizerError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, "<html>gateway</html>"),
            Err(SummarizerError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, r#"{"output_text": "   "}"#),
            Err(SummarizerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_interpret_truncation_is_budget_exceeded() {
        let body = r#"{
            "status": "incomplete",
            "incomplete_details": {"reason": "max_output_tokens"},
            "output_text": "partial"
        }"#;
        assert!(matches!(
            interpret_response(200, body),
            Err(SummarizerError::BudgetExceeded(_))
        ));

        let body = r#"{"error": {"code": "context_length_exceeded"}}"#;
        assert!(matches!(
            interpret_response(400, body),
            Err(SummarizerError::BudgetExceeded(_))
        ));
    }

    #[test]
    fn test_interpret_error_status_is_service_unavailable() {
        for status in [429, 500, 503] {
            assert!(matches!(
                interpret_response(status, "{}"),
                Err(SummarizerError::ServiceUnavailable(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_oversized_prompt_fails_without_network() {
        let client = LlmSummarizer::new(
            "test_key".to_string(),
            "http://127.0.0.1:9".to_string(),
            "gpt-4o-mini".to_string(),
            1024,
        );
        let prompt = "a".repeat(1_000_000);
        assert!(matches!(
            client.summarize(&prompt).await,
            Err(SummarizerError::BudgetExceeded(_))
        ));
    }
}
