//! Settings file management

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConnectError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::provisioning::DEFAULT_AP_HOST;

/// Controller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,

    /// Also write logs under the storage layout's logs directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Device address while in AP mode, when the QR code carries none
    #[serde(default = "default_ap_host")]
    pub ap_host: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Allow onboarding the built-in simulated device
    #[serde(default)]
    pub demo_mode: bool,

    /// Newest firmware release known to the controller
    #[serde(default)]
    pub latest_firmware: Option<String>,
}

fn default_ap_host() -> String {
    DEFAULT_AP_HOST.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            log_to_file: false,
            ap_host: default_ap_host(),
            request_timeout_secs: default_request_timeout(),
            demo_mode: false,
            latest_firmware: None,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, ConnectError> {
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }

        file.read_json().await.map_err(|e| {
            ConnectError::ConfigError(format!(
                "Failed to read {}: {}",
                file.path().display(),
                e
            ))
        })
    }

    pub async fn save(&self, file: &File) -> Result<(), ConnectError> {
        file.write_json(self).await
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
