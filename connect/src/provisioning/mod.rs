//! Provisioning handshake

pub mod demo;
pub mod service;

pub use service::{ProvisionResult, ProvisioningService, DEFAULT_AP_HOST};
