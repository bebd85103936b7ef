//! Onboarding QR code handling

pub mod parser;

pub use device_api::QrPayload;
pub use parser::{decode_qr_payload, parse_qr_payload};
