//! Application configuration options

use std::collections::HashMap;
use std::time::Duration;

use crate::errors::ConnectError;
use crate::http::transport::DEFAULT_REQUEST_TIMEOUT;
use crate::onboarding::OnboardingOptions;
use crate::provisioning::DEFAULT_AP_HOST;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Device address while in AP mode, when the QR code carries none
    pub ap_host: String,

    /// Per-request timeout towards devices
    pub request_timeout: Duration,

    /// Onboarding behaviour
    pub onboarding: OnboardingOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            layout: StorageLayout::default(),
            ap_host: DEFAULT_AP_HOST.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            onboarding: OnboardingOptions::default(),
        }
    }
}

impl AppOptions {
    /// Options from the settings file
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        Self {
            layout,
            ap_host: settings.ap_host.clone(),
            request_timeout: settings.request_timeout(),
            onboarding: OnboardingOptions {
                demo_mode: settings.demo_mode,
                latest_firmware: settings.latest_firmware.clone(),
                ..Default::default()
            },
        }
    }

    /// Apply `--ap-host`, `--timeout` and `--demo` overrides
    pub fn apply_cli_overrides(
        mut self,
        cli_args: &HashMap<String, String>,
    ) -> Result<Self, ConnectError> {
        if let Some(host) = cli_args.get("ap-host") {
            self.ap_host = host.clone();
        }

        if let Some(timeout) = cli_args.get("timeout") {
            let secs: u64 = timeout
                .parse()
                .map_err(|_| ConnectError::ConfigError(format!("Invalid --timeout: {}", timeout)))?;
            self.request_timeout = Duration::from_secs(secs.max(1));
        }

        if cli_args.contains_key("demo") {
            self.onboarding.demo_mode = true;
        }

        Ok(self)
    }
}
