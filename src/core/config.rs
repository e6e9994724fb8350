use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::models::MessageFormat;
use crate::ai::prompt_builder::DEFAULT_PROMPT_MAX_CHARS;
use crate::errors::RelayError;

pub const DEFAULT_AI_THRESHOLD: usize = 5000;
pub const DEFAULT_SIMPLE_FORMAT_THRESHOLD: usize = 3500;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4096;
pub const DEFAULT_SIMPLE_FORMAT_MAX_CHARS: usize = 3800;
pub const DEFAULT_SUMMARIZER_MAX_OUTPUT_TOKENS: usize = 1024;
pub const DEFAULT_SUMMARIZER_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Per-invocation settings for the processing pipeline.
///
/// Read once at the start of an invocation and passed down explicitly; nothing
/// in the pipeline reads the environment itself.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub ai_enabled: bool,
    pub ai_threshold: usize,
    pub simple_threshold: usize,
    pub max_message_length: usize,
    pub simple_format_max_chars: usize,
    pub prompt_max_chars: usize,
    pub ai_model_id: Option<String>,
    pub summarizer_max_output_tokens: usize,
    pub summarizer_timeout: Duration,
    /// When set, `confirm_destroy` output goes to the AI path at any length.
    pub confirm_destroy_bypass_threshold: bool,
    pub message_format: MessageFormat,
    pub authorized_chat_ids: Vec<String>,
    pub github_repository: Option<String>,
    pub openai_base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ai_enabled: false,
            ai_threshold: DEFAULT_AI_THRESHOLD,
            simple_threshold: DEFAULT_SIMPLE_FORMAT_THRESHOLD,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            simple_format_max_chars: DEFAULT_SIMPLE_FORMAT_MAX_CHARS,
            prompt_max_chars: DEFAULT_PROMPT_MAX_CHARS,
            ai_model_id: None,
            summarizer_max_output_tokens: DEFAULT_SUMMARIZER_MAX_OUTPUT_TOKENS,
            summarizer_timeout: Duration::from_secs(DEFAULT_SUMMARIZER_TIMEOUT_SECS),
            confirm_destroy_bypass_threshold: false,
            message_format: MessageFormat::default(),
            authorized_chat_ids: Vec::new(),
            github_repository: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

impl RelayConfig {
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if a value cannot be parsed or AI is
    /// enabled without a model identifier.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same conditions as [`RelayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let ai_enabled = parse_flag(&get, "AI_PROCESSING_ENABLED", defaults.ai_enabled)?;
        let ai_model_id = get("AI_MODEL_ID");
        if ai_enabled && ai_model_id.is_none() {
            return Err(RelayError::ConfigurationMissing(
                "AI_MODEL_ID is required when AI_PROCESSING_ENABLED is set".to_string(),
            ));
        }

        let message_format = match get("MESSAGE_FORMAT") {
            Some(raw) => MessageFormat::parse(&raw).ok_or_else(|| {
                RelayError::ConfigurationMissing(format!("MESSAGE_FORMAT: unsupported value {raw}"))
            })?,
            None => defaults.message_format,
        };

        let authorized_chat_ids = get("AUTHORIZED_CHAT_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            ai_enabled,
            ai_threshold: parse_number(&get, "AI_THRESHOLD", defaults.ai_threshold)?,
            simple_threshold: parse_number(
                &get,
                "SIMPLE_FORMAT_THRESHOLD",
                defaults.simple_threshold,
            )?,
            max_message_length: parse_number(
                &get,
                "MAX_MESSAGE_LENGTH",
                defaults.max_message_length,
            )?,
            simple_format_max_chars: parse_number(
                &get,
                "SIMPLE_FORMAT_MAX_CHARS",
                defaults.simple_format_max_chars,
            )?,
            prompt_max_chars: parse_number(&get, "PROMPT_MAX_CHARS", defaults.prompt_max_chars)?,
            ai_model_id,
            summarizer_max_output_tokens: parse_number(
                &get,
                "SUMMARIZER_MAX_OUTPUT_TOKENS",
                defaults.summarizer_max_output_tokens,
            )?,
            summarizer_timeout: Duration::from_secs(parse_number(
                &get,
                "SUMMARIZER_TIMEOUT_SECS",
                DEFAULT_SUMMARIZER_TIMEOUT_SECS,
            )?),
            confirm_destroy_bypass_threshold: parse_flag(
                &get,
                "CONFIRM_DESTROY_BYPASS_THRESHOLD",
                defaults.confirm_destroy_bypass_threshold,
            )?,
            message_format,
            authorized_chat_ids,
            github_repository: get("GITHUB_REPOSITORY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
        })
    }

    /// An empty allow-list admits every chat.
    #[must_use]
    pub fn is_chat_authorized(&self, chat_id: &str) -> bool {
        self.authorized_chat_ids.is_empty() || self.authorized_chat_ids.iter().any(|id| id == chat_id)
    }
}

fn parse_number<G, T>(get: &G, name: &str, default: T) -> Result<T, RelayError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| RelayError::ConfigurationMissing(format!("{name}: {e}"))),
        None => Ok(default),
    }
}

fn parse_flag<G>(get: &G, name: &str, default: bool) -> Result<bool, RelayError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(RelayError::ConfigurationMissing(format!(
            "{name}: expected a boolean, got {v}"
        ))),
        None => Ok(default),
    }
}
