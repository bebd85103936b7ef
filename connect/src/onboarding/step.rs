//! Onboarding steps

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an onboarding session stands, in legal path order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingStep {
    /// Waiting for a QR code
    #[default]
    Scan,

    /// Identifying the device over its access point
    Connecting,

    /// Device identified, showing model and firmware
    ProductInfo,

    /// Newer firmware is available
    FirmwareUpdate,

    /// Choosing the target network
    WifiSetup,

    /// Handing off credentials and reaching the device on the target network
    Verifying,

    /// Naming the device
    Name,

    /// Reviewing default configuration
    Configure,

    /// Paired
    Complete,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 9] = [
        OnboardingStep::Scan,
        OnboardingStep::Connecting,
        OnboardingStep::ProductInfo,
        OnboardingStep::FirmwareUpdate,
        OnboardingStep::WifiSetup,
        OnboardingStep::Verifying,
        OnboardingStep::Name,
        OnboardingStep::Configure,
        OnboardingStep::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStep::Scan => "scan",
            OnboardingStep::Connecting => "connecting",
            OnboardingStep::ProductInfo => "product-info",
            OnboardingStep::FirmwareUpdate => "firmware-update",
            OnboardingStep::WifiSetup => "wifi-setup",
            OnboardingStep::Verifying => "verifying",
            OnboardingStep::Name => "name",
            OnboardingStep::Configure => "configure",
            OnboardingStep::Complete => "complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OnboardingStep::Complete)
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OnboardingStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OnboardingStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("Invalid onboarding step: {}", s))
    }
}
