//! Onboarding session state

use device_api::{DeviceInfo, QrPayload, WifiNetwork};
use serde::Serialize;

use crate::onboarding::firmware::FirmwareUpdateInfo;
use crate::onboarding::step::OnboardingStep;

/// Working memory of the one live onboarding session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OnboardingSession {
    pub step: OnboardingStep,
    pub qr_data: Option<QrPayload>,
    pub device_info: Option<DeviceInfo>,
    pub networks: Vec<WifiNetwork>,
    pub selected_ssid: Option<String>,
    pub device_name: String,

    /// Last failure, cleared when the next attempt starts
    pub error: Option<String>,

    /// A remote operation is in flight
    pub is_loading: bool,

    /// Address the device took on the target network
    pub assigned_ip: Option<String>,

    pub firmware_update: Option<FirmwareUpdateInfo>,

    /// Cosmetic update progress, 0-100
    pub firmware_progress: u8,

    /// Answered by the built-in simulated device
    pub demo: bool,
}

impl OnboardingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to initial values
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Network from the last scan with the given SSID
    pub fn network(&self, ssid: &str) -> Option<&WifiNetwork> {
        self.networks.iter().find(|n| n.ssid == ssid)
    }
}
