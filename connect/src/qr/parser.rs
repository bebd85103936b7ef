//! QR payload parser
//!
//! The display renders `{ap_ssid, ap_pass, device_id, api_port, ip?}` as JSON.
//! Only the type of each required field is checked; extra fields are ignored.

use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::ConnectError;
use crate::qr::QrPayload;

/// Parse a scanned QR string, returning `None` when it is not a valid payload
pub fn parse_qr_payload(raw: &str) -> Option<QrPayload> {
    match decode_qr_payload(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(target: "qr", "Rejected QR payload: {}", e);
            None
        }
    }
}

/// Parse a scanned QR string, reporting why it was rejected
pub fn decode_qr_payload(raw: &str) -> Result<QrPayload, ConnectError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| ConnectError::InvalidPayload(format!("not JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| ConnectError::InvalidPayload("not a JSON object".to_string()))?;

    let ap_ssid = required_string(object, "ap_ssid")?;
    let ap_pass = required_string(object, "ap_pass")?;
    let device_id = required_string(object, "device_id")?;
    let api_port = required_port(object)?;

    // A non-string ip is dropped rather than failing the scan.
    let ip = object
        .get("ip")
        .and_then(Value::as_str)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string);

    Ok(QrPayload {
        ap_ssid,
        ap_pass,
        device_id,
        api_port,
        ip,
    })
}

fn required_string(object: &Map<String, Value>, field: &str) -> Result<String, ConnectError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConnectError::InvalidPayload(format!("'{}' must be a string", field)))
}

fn required_port(object: &Map<String, Value>) -> Result<u16, ConnectError> {
    let port = object
        .get("api_port")
        .filter(|v| v.is_number())
        .ok_or_else(|| ConnectError::InvalidPayload("'api_port' must be a number".to_string()))?;

    // 8080.0 is still port 8080
    let whole = port.as_u64().or_else(|| {
        port.as_f64()
            .filter(|p| p.fract() == 0.0 && *p >= 0.0 && *p <= f64::from(u16::MAX))
            .map(|p| p as u64)
    });

    whole
        .and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .ok_or_else(|| {
            ConnectError::InvalidPayload(format!("'api_port' {} is not a valid port", port))
        })
}
