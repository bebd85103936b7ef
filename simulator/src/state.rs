//! Simulated device state

use std::time::Instant;

use device_api::{DeviceInfo, DeviceStatus, QrPayload, WifiNetwork, WifiSecurity};
use tokio::sync::RwLock;
use tracing::info;

use crate::console::Console;

pub const AP_SSID: &str = "ALAMIRA-SIM";
pub const AP_PASS: &str = "simulator";

/// SSID reported by `/api/status` before any provisioning
pub const DEFAULT_SSID: &str = "SimulatorAP";

/// Signal strength reported by `/api/status`
pub const STATUS_RSSI: i32 = -45;

/// Fixed identity and network of the simulated display
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    pub device_id: String,
    pub model: String,
    pub firmware_version: String,
    pub serial: String,

    /// Address reported by `/api/provision` and `/api/status`
    pub advertised_ip: String,

    /// Networks answered by `/api/wifi/scan`
    pub networks: Vec<WifiNetwork>,

    /// Console entries kept before the oldest is dropped
    pub console_capacity: usize,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            device_id: "ALM-SIM-001".to_string(),
            model: "Alamira Display Simulator".to_string(),
            firmware_version: "1.0.0".to_string(),
            serial: "SIM-2026-001".to_string(),
            advertised_ip: "0.0.0.0".to_string(),
            networks: default_networks(),
            console_capacity: 200,
        }
    }
}

pub fn default_networks() -> Vec<WifiNetwork> {
    vec![
        WifiNetwork::new("HomeNetwork", -42, WifiSecurity::Wpa2),
        WifiNetwork::new("Marina_WiFi", -58, WifiSecurity::Wpa2),
        WifiNetwork::new("Guest_Open", -71, WifiSecurity::Open),
    ]
}

/// Mutable part of the device
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub brightness: u8,
    pub status: String,
    pub current_ip: String,
    pub provisioned_ssid: Option<String>,
}

/// State shared by every handler
pub struct SimulatorState {
    pub options: SimulatorOptions,
    pub console: Console,
    started_at: Instant,
    device: RwLock<DeviceState>,
}

impl SimulatorState {
    pub fn new(options: SimulatorOptions) -> Self {
        let device = DeviceState {
            brightness: 75,
            status: "running".to_string(),
            current_ip: options.advertised_ip.clone(),
            provisioned_ssid: None,
        };

        Self {
            console: Console::new(options.console_capacity),
            options,
            started_at: Instant::now(),
            device: RwLock::new(device),
        }
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: self.options.device_id.clone(),
            model: self.options.model.clone(),
            firmware_version: self.options.firmware_version.clone(),
            serial: self.options.serial.clone(),
        }
    }

    pub async fn device(&self) -> DeviceState {
        self.device.read().await.clone()
    }

    pub async fn status(&self) -> DeviceStatus {
        let device = self.device.read().await;
        DeviceStatus {
            uptime: self.started_at.elapsed().as_secs(),
            wifi_rssi: STATUS_RSSI,
            ip: device.current_ip.clone(),
            ssid: device
                .provisioned_ssid
                .clone()
                .unwrap_or_else(|| DEFAULT_SSID.to_string()),
        }
    }

    /// Accept credentials for `ssid`, returning the address the device now has
    pub async fn provision(&self, ssid: &str) -> String {
        let mut device = self.device.write().await;
        device.provisioned_ssid = Some(ssid.to_string());
        info!(target: "simulator", "Provisioned for network \"{}\"", ssid);
        device.current_ip.clone()
    }

    pub async fn set_current_ip(&self, ip: impl Into<String>) {
        self.device.write().await.current_ip = ip.into();
    }

    /// Payload to render as the device's QR code
    pub async fn qr_payload(&self, port: u16) -> QrPayload {
        QrPayload {
            ap_ssid: AP_SSID.to_string(),
            ap_pass: AP_PASS.to_string(),
            device_id: self.options.device_id.clone(),
            api_port: port,
            ip: Some(self.device.read().await.current_ip.clone()),
        }
    }
}
