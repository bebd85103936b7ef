//! Built-in simulated display used by demo sessions

use device_api::{DeviceInfo, QrPayload, WifiNetwork, WifiSecurity};

use crate::onboarding::firmware::FirmwareUpdateInfo;

/// A display that answers without any network traffic
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub qr_payload: QrPayload,
    pub device_info: DeviceInfo,
    pub firmware_update: FirmwareUpdateInfo,
    pub networks: Vec<WifiNetwork>,
}

impl SimulatedDevice {
    /// Address the simulated display reports after provisioning
    pub fn assigned_ip(&self) -> String {
        self.qr_payload
            .ip
            .clone()
            .unwrap_or_else(|| "192.168.1.100".to_string())
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            qr_payload: QrPayload {
                ap_ssid: "ALAMIRA-SIM".to_string(),
                ap_pass: "simulator".to_string(),
                device_id: "ALM-DEMO-001".to_string(),
                api_port: 8080,
                ip: Some("192.168.1.100".to_string()),
            },
            device_info: DeviceInfo {
                device_id: "ALM-DEMO-001".to_string(),
                model: "Alamira MFD-7".to_string(),
                firmware_version: "1.2.0".to_string(),
                serial: "ALM-2026-DEMO-001".to_string(),
            },
            firmware_update: FirmwareUpdateInfo {
                current_version: "1.2.0".to_string(),
                available_version: "1.3.0".to_string(),
                update_available: true,
                release_notes: "Improved NMEA 2000 parsing, night mode, bug fixes.".to_string(),
            },
            networks: vec![
                WifiNetwork::new("HomeNetwork", -42, WifiSecurity::Wpa2),
                WifiNetwork::new("Marina_WiFi", -58, WifiSecurity::Wpa2),
                WifiNetwork::new("Guest_Open", -71, WifiSecurity::Open),
            ],
        }
    }
}
