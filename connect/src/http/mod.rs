//! Device control API client

pub mod device_api;
pub mod transport;
