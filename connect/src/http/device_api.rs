//! Typed calls against the device control API

use std::sync::Arc;

use device_api::{
    paths, DeviceInfo, DeviceStatus, ProvisionRequest, ProvisionResponse, WifiNetwork,
    WifiScanResponse,
};
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::errors::ConnectError;
use crate::http::transport::Transport;

/// Control API client over any [`Transport`]
#[derive(Clone)]
pub struct DeviceApiClient {
    transport: Arc<dyn Transport>,
}

impl DeviceApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        host: &str,
        port: u16,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ConnectError> {
        let value = self.transport.call(method, host, port, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `GET /api/info`
    pub async fn get_device_info(&self, host: &str, port: u16) -> Result<DeviceInfo, ConnectError> {
        info!(target: "wifi", "GET {}:{}{}", host, port, paths::INFO);

        match self.request::<DeviceInfo>(Method::GET, host, port, paths::INFO, None).await {
            Ok(device) => {
                info!(target: "wifi", "Device info received: {} ({})", device.model, device.device_id);
                Ok(device)
            }
            Err(e) => {
                error!(target: "wifi", "Failed to get device info from {}: {}", host, e);
                Err(e)
            }
        }
    }

    /// `GET /api/wifi/scan`
    pub async fn scan_networks(&self, host: &str, port: u16) -> Result<Vec<WifiNetwork>, ConnectError> {
        info!(target: "wifi", "GET {}:{}{}", host, port, paths::WIFI_SCAN);

        match self
            .request::<WifiScanResponse>(Method::GET, host, port, paths::WIFI_SCAN, None)
            .await
        {
            Ok(scan) => {
                info!(target: "wifi", "Scan complete: found {} networks", scan.networks.len());
                Ok(scan.networks)
            }
            Err(e) => {
                error!(target: "wifi", "Failed to scan networks from {}: {}", host, e);
                Err(e)
            }
        }
    }

    /// `POST /api/provision`
    ///
    /// Returns the raw device answer; `success == false` is not an error here.
    pub async fn provision(
        &self,
        host: &str,
        port: u16,
        request: &ProvisionRequest,
    ) -> Result<ProvisionResponse, ConnectError> {
        info!(target: "wifi", "POST {}:{}{} (ssid: {})", host, port, paths::PROVISION, request.ssid);

        let body = serde_json::to_value(request)?;
        match self
            .request::<ProvisionResponse>(Method::POST, host, port, paths::PROVISION, Some(body))
            .await
        {
            Ok(response) => {
                if response.success {
                    info!(target: "wifi", "Provisioned successfully, device IP: {}", response.ip);
                } else {
                    warn!(target: "wifi", "Provision returned success=false for ssid: {}", request.ssid);
                }
                Ok(response)
            }
            Err(e) => {
                error!(target: "wifi", "Failed to provision {} via {}: {}", request.ssid, host, e);
                Err(e)
            }
        }
    }

    /// `GET /api/status`
    pub async fn get_status(&self, host: &str, port: u16) -> Result<DeviceStatus, ConnectError> {
        info!(target: "wifi", "GET {}:{}{}", host, port, paths::STATUS);

        match self.request::<DeviceStatus>(Method::GET, host, port, paths::STATUS, None).await {
            Ok(status) => {
                info!(
                    target: "wifi",
                    "Device status: ssid={}, ip={}, rssi={}",
                    status.ssid, status.ip, status.wifi_rssi
                );
                Ok(status)
            }
            Err(e) => {
                error!(target: "wifi", "Failed to get device status from {}: {}", host, e);
                Err(e)
            }
        }
    }
}
