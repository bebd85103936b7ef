//! Error types for Alamira Connect

use thiserror::Error;

use crate::onboarding::step::OnboardingStep;

/// Main error type for the controller
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid QR code: {0}")]
    InvalidPayload(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out after {elapsed_ms}ms: {method} {url}")]
    Timeout {
        method: String,
        url: String,
        elapsed_ms: u64,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provisioning failed for network \"{ssid}\"")]
    ProvisioningFailed { ssid: String },

    #[error("Another onboarding operation is already in progress")]
    Busy,

    #[error("Onboarding session was cancelled")]
    Cancelled,

    #[error("Cannot {action} while at step '{step}'")]
    InvalidTransition {
        step: OnboardingStep,
        action: &'static str,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConnectError {
    /// Failure of the HTTP exchange itself rather than of the device
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConnectError::Http { .. } | ConnectError::Timeout { .. } | ConnectError::Network(_)
        )
    }

    /// Whether the user can retry from the step the session rolled back to
    pub fn is_retryable(&self) -> bool {
        self.is_transport()
            || matches!(
                self,
                ConnectError::ProvisioningFailed { .. } | ConnectError::JsonError(_)
            )
    }
}

impl From<anyhow::Error> for ConnectError {
    fn from(err: anyhow::Error) -> Self {
        ConnectError::Internal(err.to_string())
    }
}
