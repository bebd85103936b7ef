//! Paired device registry
//!
//! The whole list lives as one JSON array under [`PAIRED_DEVICES_KEY`]. Every
//! mutation is a read-modify-write of that list, serialized by `write_lock`;
//! writers in other processes are not coordinated.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::errors::ConnectError;
use crate::registry::device::{ConnectionType, DataConnection, DevicePatch, PairedDevice};
use crate::registry::store::KeyValueStore;

/// Storage key of the paired device list
pub const PAIRED_DEVICES_KEY: &str = "@alamira/paired-devices";

/// Data source to link to a paired device
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub kind: ConnectionType,
    pub host: String,
    pub port: Option<u16>,
    pub name: Option<String>,
}

pub struct DeviceRegistry {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<PairedDevice>, ConnectError> {
        let raw = match self.store.get(PAIRED_DEVICES_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };

        match serde_json::from_str(&raw) {
            Ok(devices) => Ok(devices),
            Err(e) => {
                error!(target: "device", "Failed to load paired devices: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, devices: &[PairedDevice]) -> Result<(), ConnectError> {
        let raw = serde_json::to_string(devices)?;
        self.store.set(PAIRED_DEVICES_KEY, &raw).await
    }

    /// All paired devices, in pairing order
    pub async fn list(&self) -> Result<Vec<PairedDevice>, ConnectError> {
        self.load().await
    }

    /// Look up one device; a miss is `None`
    pub async fn get(&self, id: &str) -> Result<Option<PairedDevice>, ConnectError> {
        Ok(self.load().await?.into_iter().find(|d| d.id == id))
    }

    /// Append a device. Re-pairing an id already present replaces that entry in place.
    pub async fn add(&self, device: PairedDevice) -> Result<(), ConnectError> {
        let _guard = self.write_lock.lock().await;
        let mut devices = self.load().await?;

        match devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => {
                info!(target: "device", "Re-pairing device: {} ({})", device.name, device.id);
                *existing = device;
            }
            None => {
                info!(target: "device", "Adding device: {} ({})", device.name, device.id);
                devices.push(device);
            }
        }

        self.save(&devices).await
    }

    /// Merge `patch` into the device with `id`; no-op when absent
    pub async fn update(
        &self,
        id: &str,
        patch: DevicePatch,
    ) -> Result<Option<PairedDevice>, ConnectError> {
        let _guard = self.write_lock.lock().await;
        let mut devices = self.load().await?;

        let Some(device) = devices.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        patch.apply(device);
        let updated = device.clone();

        self.save(&devices).await?;
        info!(target: "device", "Updated device: {}", id);
        Ok(Some(updated))
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<Option<PairedDevice>, ConnectError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConnectError::ValidationError(
                "Device name cannot be empty".to_string(),
            ));
        }
        self.update(id, DevicePatch::name(name)).await
    }

    /// Unpair a device; returns whether it was present
    pub async fn remove(&self, id: &str) -> Result<bool, ConnectError> {
        let _guard = self.write_lock.lock().await;
        let mut devices = self.load().await?;

        let before = devices.len();
        devices.retain(|d| d.id != id);
        if devices.len() == before {
            return Ok(false);
        }

        self.save(&devices).await?;
        info!(target: "device", "Removed device: {}", id);
        Ok(true)
    }

    /// Link a data source. Signal K and NMEA 2000 links replace the existing
    /// one of the same type; NMEA 0183 links accumulate.
    pub async fn link_connection(
        &self,
        device_id: &str,
        connection: NewConnection,
    ) -> Result<Option<DataConnection>, ConnectError> {
        let host = connection.host.trim();
        if host.is_empty() {
            return Err(ConnectError::ValidationError(
                "Connection host cannot be empty".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut devices = self.load().await?;

        let Some(device) = devices.iter_mut().find(|d| d.id == device_id) else {
            return Ok(None);
        };

        let linked = DataConnection {
            id: uuid::Uuid::new_v4().to_string(),
            kind: connection.kind,
            host: host.to_string(),
            port: connection.port.unwrap_or_else(|| connection.kind.default_port()),
            name: connection.name.filter(|n| !n.trim().is_empty()),
            linked_at: Utc::now(),
        };

        if !linked.kind.allows_multiple() {
            device.connections.retain(|c| c.kind != linked.kind);
        }
        device.connections.push(linked.clone());

        self.save(&devices).await?;
        info!(
            target: "device",
            "Linked {:?} source {}:{} to {}", linked.kind, linked.host, linked.port, device_id
        );
        Ok(Some(linked))
    }

    /// Remove one linked data source; returns whether it was present
    pub async fn unlink_connection(
        &self,
        device_id: &str,
        connection_id: &str,
    ) -> Result<bool, ConnectError> {
        let _guard = self.write_lock.lock().await;
        let mut devices = self.load().await?;

        let Some(device) = devices.iter_mut().find(|d| d.id == device_id) else {
            return Ok(false);
        };

        let before = device.connections.len();
        device.connections.retain(|c| c.id != connection_id);
        if device.connections.len() == before {
            return Ok(false);
        }

        self.save(&devices).await?;
        Ok(true)
    }
}
