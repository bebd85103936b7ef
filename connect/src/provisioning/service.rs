//! WiFi provisioning sequence
//!
//! Four remote operations, always in this order:
//! identify over the AP, scan networks, hand off credentials, then verify the
//! device on the network it just joined.

use std::sync::Arc;

use device_api::{DeviceInfo, DeviceStatus, ProvisionRequest, ProvisionResponse, WifiNetwork};
use tracing::{info, warn};

use crate::errors::ConnectError;
use crate::http::device_api::DeviceApiClient;
use crate::http::transport::Transport;
use crate::qr::QrPayload;

/// Gateway address of the display's temporary access point
pub const DEFAULT_AP_HOST: &str = "192.168.4.1";

/// Outcome of a credential hand-off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionResult {
    pub success: bool,

    /// Address on the target network; never empty when `success` is set
    pub assigned_ip: String,
}

impl ProvisionResult {
    /// Validate a device answer. A refused or address-less answer is a
    /// `ProvisioningFailed` even though the HTTP exchange succeeded.
    pub fn from_response(ssid: &str, response: ProvisionResponse) -> Result<Self, ConnectError> {
        let assigned_ip = response.ip.trim().to_string();
        if !response.success || assigned_ip.is_empty() {
            return Err(ConnectError::ProvisioningFailed {
                ssid: ssid.to_string(),
            });
        }

        Ok(Self {
            success: true,
            assigned_ip,
        })
    }
}

/// Drives a display through the provisioning handshake
#[derive(Clone)]
pub struct ProvisioningService {
    api: DeviceApiClient,
    ap_host: String,
}

impl ProvisioningService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_ap_host(transport, DEFAULT_AP_HOST)
    }

    pub fn with_ap_host(transport: Arc<dyn Transport>, ap_host: impl Into<String>) -> Self {
        Self {
            api: DeviceApiClient::new(transport),
            ap_host: ap_host.into(),
        }
    }

    /// Host serving the control API while the device is in AP mode
    pub fn ap_host(&self, qr: &QrPayload) -> String {
        qr.ip.clone().unwrap_or_else(|| self.ap_host.clone())
    }

    /// Step 1: identify the device over its access point
    pub async fn connect_to_device(&self, qr: &QrPayload) -> Result<DeviceInfo, ConnectError> {
        let host = self.ap_host(qr);
        info!(
            target: "wifi",
            "Connecting to device AP {} at {}:{}", qr.ap_ssid, host, qr.api_port
        );

        let device = self.api.get_device_info(&host, qr.api_port).await?;
        if device.device_id != qr.device_id {
            warn!(
                target: "wifi",
                "Device at {} reports id {} but QR code says {}",
                host, device.device_id, qr.device_id
            );
        }

        info!(
            target: "wifi",
            "Connected to device {} ({} v{})",
            device.device_id, device.model, device.firmware_version
        );
        Ok(device)
    }

    /// Step 2: list the networks the device can see. An empty list is valid.
    pub async fn scan_networks(&self, host: &str, port: u16) -> Result<Vec<WifiNetwork>, ConnectError> {
        info!(target: "wifi", "Scanning for WiFi networks via {}:{}", host, port);
        let networks = self.api.scan_networks(host, port).await?;
        info!(target: "wifi", "Found {} networks", networks.len());
        Ok(networks)
    }

    /// Step 3: hand the target network credentials to the device
    pub async fn provision(
        &self,
        host: &str,
        port: u16,
        ssid: &str,
        password: &str,
    ) -> Result<ProvisionResult, ConnectError> {
        info!(target: "wifi", "Provisioning device at {}:{} for network \"{}\"", host, port, ssid);

        let request = ProvisionRequest {
            ssid: ssid.to_string(),
            password: password.to_string(),
        };
        let response = self.api.provision(host, port, &request).await?;

        match ProvisionResult::from_response(ssid, response) {
            Ok(result) => {
                info!(target: "wifi", "Provisioning succeeded, device IP: {}", result.assigned_ip);
                Ok(result)
            }
            Err(e) => {
                warn!(target: "wifi", "Provisioning failed for network \"{}\"", ssid);
                Err(e)
            }
        }
    }

    /// Step 4: reach the device at its new address on the target network.
    ///
    /// An identity change is logged, not rejected.
    pub async fn verify_connection(
        &self,
        host: &str,
        port: u16,
        expected_device_id: Option<&str>,
    ) -> Result<DeviceInfo, ConnectError> {
        info!(target: "wifi", "Verifying device reachable at {}:{}", host, port);

        let device = self.api.get_device_info(host, port).await?;
        if let Some(expected) = expected_device_id {
            if expected != device.device_id {
                warn!(
                    target: "wifi",
                    "Device identity changed after joining network: {} -> {}",
                    expected, device.device_id
                );
            }
        }

        info!(target: "wifi", "Device {} verified on network at {}", device.device_id, host);
        Ok(device)
    }

    /// Runtime status of a device
    pub async fn device_status(&self, host: &str, port: u16) -> Result<DeviceStatus, ConnectError> {
        self.api.get_status(host, port).await
    }
}
