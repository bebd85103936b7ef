//! API models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Device identity, as reported by `GET /api/info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub model: String,
    pub firmware_version: String,
    pub serial: String,
}

/// WiFi security mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WifiSecurity {
    Open,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "WPA")]
    Wpa,
    #[serde(rename = "WPA2")]
    Wpa2,
    #[serde(rename = "WPA3")]
    Wpa3,
}

impl WifiSecurity {
    /// Whether joining the network needs a passphrase
    pub fn requires_password(&self) -> bool {
        !matches!(self, WifiSecurity::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WifiSecurity::Open => "Open",
            WifiSecurity::Wep => "WEP",
            WifiSecurity::Wpa => "WPA",
            WifiSecurity::Wpa2 => "WPA2",
            WifiSecurity::Wpa3 => "WPA3",
        }
    }
}

impl fmt::Display for WifiSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network visible to the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,

    /// Signal strength in dBm
    pub rssi: i32,

    pub security: WifiSecurity,
}

impl WifiNetwork {
    pub fn new(ssid: impl Into<String>, rssi: i32, security: WifiSecurity) -> Self {
        Self {
            ssid: ssid.into(),
            rssi,
            security,
        }
    }

    /// Human label for the signal strength
    pub fn signal_label(&self) -> &'static str {
        if self.rssi > -50 {
            "Strong"
        } else if self.rssi > -70 {
            "Good"
        } else {
            "Weak"
        }
    }
}

/// `GET /api/wifi/scan` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WifiScanResponse {
    pub networks: Vec<WifiNetwork>,
}

/// `POST /api/provision` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub ssid: String,

    #[serde(default)]
    pub password: String,
}

/// `POST /api/provision` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub success: bool,

    /// Address the device holds on the target network
    pub ip: String,
}

impl ProvisionResponse {
    pub fn failed() -> Self {
        Self {
            success: false,
            ip: String::new(),
        }
    }
}

/// `GET /api/status` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Seconds since boot
    pub uptime: u64,
    pub wifi_rssi: i32,
    pub ip: String,
    pub ssid: String,
}

/// `POST /api/message` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// `POST /api/message` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub received: bool,
}

/// Onboarding QR code contents, as rendered on the device screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub ap_ssid: String,
    pub ap_pass: String,
    pub device_id: String,
    pub api_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}
