//! Paired device records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of marine data source linked to a display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Signalk,
    Nmea2000,
    Nmea0183,
}

impl ConnectionType {
    pub fn default_port(&self) -> u16 {
        match self {
            ConnectionType::Signalk => 3000,
            ConnectionType::Nmea2000 | ConnectionType::Nmea0183 => 10110,
        }
    }

    /// NMEA 0183 sources stack; the others hold at most one link
    pub fn allows_multiple(&self) -> bool {
        matches!(self, ConnectionType::Nmea0183)
    }
}

impl std::str::FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "signalk" => Ok(ConnectionType::Signalk),
            "nmea2000" => Ok(ConnectionType::Nmea2000),
            "nmea0183" => Ok(ConnectionType::Nmea0183),
            _ => Err(format!("Invalid connection type: {}", s)),
        }
    }
}

/// A data source linked to a paired display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConnection {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ConnectionType,

    pub host: String,
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub linked_at: DateTime<Utc>,
}

/// A display that completed onboarding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedDevice {
    /// Device ID reported by the display
    pub id: String,

    pub name: String,
    pub ip: String,
    pub port: u16,
    pub model: String,
    pub firmware_version: String,
    pub serial: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub paired_at: DateTime<Utc>,

    #[serde(default)]
    pub connections: Vec<DataConnection>,
}

/// Partial update applied by [`DeviceRegistry::update`](crate::registry::DeviceRegistry::update)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub serial: Option<String>,
    pub connections: Option<Vec<DataConnection>>,
}

impl DevicePatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Merge the set fields into `device`; `id` and `paired_at` never change
    pub fn apply(self, device: &mut PairedDevice) {
        if let Some(name) = self.name {
            device.name = name;
        }
        if let Some(ip) = self.ip {
            device.ip = ip;
        }
        if let Some(port) = self.port {
            device.port = port;
        }
        if let Some(model) = self.model {
            device.model = model;
        }
        if let Some(firmware_version) = self.firmware_version {
            device.firmware_version = firmware_version;
        }
        if let Some(serial) = self.serial {
            device.serial = serial;
        }
        if let Some(connections) = self.connections {
            device.connections = connections;
        }
    }
}
