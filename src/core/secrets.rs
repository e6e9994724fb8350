use aws_sdk_ssm::Client as SsmClient;
use serde::Deserialize;
use std::env;
use tracing::info;

use crate::errors::RelayError;

/// Credentials for the external collaborators.
///
/// Stored as one JSON `SecureString` parameter in SSM; when
/// `SECRETS_PARAMETER_NAME` is unset the individual environment variables are
/// used instead (local runs and tests).
#[derive(Clone, Default, Deserialize)]
pub struct RelaySecrets {
    pub telegram_bot_token: String,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub api_gateway_key: Option<String>,
    #[serde(default)]
    pub callback_signing_secret: Option<String>,
}

impl std::fmt::Debug for RelaySecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySecrets")
            .field("telegram_bot_token", &"<redacted>")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("api_gateway_key", &self.api_gateway_key.as_ref().map(|_| "<redacted>"))
            .field(
                "callback_signing_secret",
                &self.callback_signing_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl RelaySecrets {
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if no Telegram token can be found, or an
    /// AWS error if the SSM lookup fails.
    pub async fn load() -> Result<Self, RelayError> {
        match env::var("SECRETS_PARAMETER_NAME") {
            Ok(name) if !name.trim().is_empty() => Self::from_ssm(&name).await,
            _ => Self::from_env(),
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if `TELEGRAM_BOT_TOKEN` is unset.
    pub fn from_env() -> Result<Self, RelayError> {
        let optional = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Ok(Self {
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .map_err(|e| RelayError::ConfigurationMissing(format!("TELEGRAM_BOT_TOKEN: {e}")))?,
            github_token: optional("GITHUB_TOKEN"),
            openai_api_key: optional("OPENAI_API_KEY"),
            api_gateway_key: optional("API_GATEWAY_KEY"),
            callback_signing_secret: optional("CALLBACK_SIGNING_SECRET"),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the parameter is missing, unreadable or not valid JSON.
    pub async fn from_ssm(parameter_name: &str) -> Result<Self, RelayError> {
        let shared = aws_config::from_env().load().await;
        let client = SsmClient::new(&shared);

        let resp = client
            .get_parameter()
            .name(parameter_name)
            .with_decryption(true)
            .send()
            .await?;

        let Some(value) = resp.parameter.as_ref().and_then(|p| p.value()) else {
            return Err(RelayError::ConfigurationMissing(format!(
                "secret parameter {parameter_name} has no value"
            )));
        };

        info!(parameter = %parameter_name, "Loaded relay secrets from SSM");
        Self::from_json(value)
    }

    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if the document is malformed or lacks a
    /// Telegram token.
    pub fn from_json(value: &str) -> Result<Self, RelayError> {
        let secrets: Self = serde_json::from_str(value)
            .map_err(|e| RelayError::ConfigurationMissing(format!("secret parse: {e}")))?;
        if secrets.telegram_bot_token.trim().is_empty() {
            return Err(RelayError::ConfigurationMissing(
                "telegram_bot_token is empty".to_string(),
            ));
        }
        Ok(secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_reads_optional_fields() {
        let secrets = RelaySecrets::from_json(
            r#"{"telegram_bot_token": "123:ABC", "github_token": "ghp_x", "api_gateway_key": "k"}"#,
        )
        .unwrap();
        assert_eq!(secrets.telegram_bot_token, "123:ABC");
        assert_eq!(secrets.github_token.as_deref(), Some("ghp_x"));
        assert_eq!(secrets.api_gateway_key.as_deref(), Some("k"));
        assert!(secrets.openai_api_key.is_none());
    }

    #[test]
    fn test_from_json_rejects_missing_token() {
        assert!(RelaySecrets::from_json(r#"{"github_token": "ghp_x"}"#).is_err());
        assert!(RelaySecrets::from_json(r#"{"telegram_bot_token": " "}"#).is_err());
    }

    #[test]
    fn test_debug_redacts_values() {
        let secrets = RelaySecrets::from_json(r#"{"telegram_bot_token": "123:SECRET"}"#).unwrap();
        assert!(!format!("{secrets:?}").contains("SECRET"));
    }
}
