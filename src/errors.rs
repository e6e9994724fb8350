use thiserror::Error;

/// Crate-level error surfaced to the invoking transport.
///
/// Everything inside the processing pipeline is either infallible or recovered
/// locally, so only configuration, boundary and delivery failures end up here.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Failed to parse inbound event: {0}")]
    ParseError(String),

    #[error("Unauthorized request: {0}")]
    Unauthorized(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to interact with AWS services: {0}")]
    AwsError(String),

    #[error("Failed to trigger workflow: {0}")]
    TriggerError(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Failure modes of the generative-model boundary. Always recovered by the
/// dispatcher through the simple formatter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizerError {
    #[error("Summarizer unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Summarizer returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Summarizer budget exceeded: {0}")]
    BudgetExceeded(String),
}

/// Failure modes of the chat delivery boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Chat delivery network error: {0}")]
    Network(String),

    #[error("Chat delivery rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid chat destination: {0}")]
    InvalidDestination(String),

    #[error("Chat API rejected the message: {0}")]
    Rejected(String),
}

impl DeliveryError {
    /// Transient failures the delivery adapter may retry on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(error: reqwest::Error) -> Self {
        RelayError::HttpError(error.to_string())
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(error: reqwest::Error) -> Self {
        DeliveryError::Network(error.to_string())
    }
}

// Generic implementation for AWS SDK errors
impl<E> From<aws_sdk_ssm::error::SdkError<E>> for RelayError
where
    E: std::fmt::Display,
{
    fn from(error: aws_sdk_ssm::error::SdkError<E>) -> Self {
        RelayError::AwsError(error.to_string())
    }
}
