//! Paired device registry and its storage

pub mod device;
pub mod device_registry;
pub mod store;

pub use device::{ConnectionType, DataConnection, DevicePatch, PairedDevice};
pub use device_registry::{DeviceRegistry, NewConnection, PAIRED_DEVICES_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
