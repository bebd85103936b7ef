//! Alamira Connect Library
//!
//! Controller side of the display onboarding protocol: the HTTP transport to the
//! device control API, the QR payload parser, the provisioning sequence, the
//! onboarding state machine and the paired device registry.

pub mod app;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod onboarding;
pub mod provisioning;
pub mod qr;
pub mod registry;
pub mod storage;
pub mod utils;
