//! HTTP request handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use device_api::{MessageRequest, MessageResponse, ProvisionResponse, WifiScanResponse};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::console::LogEntry;
use crate::state::SimulatorState;

/// Largest request body accepted, matching axum's default extractor limit
pub const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Bodies above this size are logged as a size marker instead of their content
pub const MAX_LOGGED_BODY: usize = 64 * 1024;

/// `GET /api/info`
pub async fn info_handler(State(state): State<Arc<SimulatorState>>) -> impl IntoResponse {
    Json(state.device_info())
}

/// `GET /api/wifi/scan`
pub async fn scan_handler(State(state): State<Arc<SimulatorState>>) -> impl IntoResponse {
    Json(WifiScanResponse {
        networks: state.options.networks.clone(),
    })
}

/// `POST /api/provision`
///
/// Any non-empty SSID is accepted. The body is read leniently so a malformed
/// request is answered with `success: false` rather than a rejection.
pub async fn provision_handler(
    State(state): State<Arc<SimulatorState>>,
    body: Bytes,
) -> impl IntoResponse {
    let request = parse_body(&body);
    let ssid = request
        .as_ref()
        .and_then(|v| v.get("ssid"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    if ssid.is_empty() {
        debug!(target: "simulator", "Provision request without SSID");
        return Json(ProvisionResponse::failed());
    }

    let ip = state.provision(ssid).await;
    Json(ProvisionResponse { success: true, ip })
}

/// `GET /api/status`
pub async fn status_handler(State(state): State<Arc<SimulatorState>>) -> impl IntoResponse {
    Json(state.status().await)
}

/// `POST /api/message`
pub async fn message_handler(body: Bytes) -> impl IntoResponse {
    match serde_json::from_slice::<MessageRequest>(&body) {
        Ok(request) => {
            info!(target: "simulator", "Message from controller: {}", request.message)
        }
        Err(e) => debug!(target: "simulator", "Unreadable message body: {}", e),
    }
    Json(MessageResponse { received: true })
}

/// Anything else
pub async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not Found", "path": uri.path() })),
    )
}

/// Echo every exchange to the console
pub async fn record_exchange(
    State(state): State<Arc<SimulatorState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let source_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let (parts, body) = request.into_parts();
    let request_bytes = match to_bytes(body, MAX_REQUEST_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(target: "simulator", "{} {} rejected: {}", method, path, e);
            let status = StatusCode::PAYLOAD_TOO_LARGE;
            let response = json!({ "error": "Payload Too Large", "path": path });
            state.console.record(LogEntry {
                timestamp: Utc::now(),
                method,
                path,
                source_ip,
                body: None,
                status: status.as_u16(),
                response: response.clone(),
            });
            return (status, Json(response)).into_response();
        }
    };
    let body = logged_body(&request_bytes);

    let response = next
        .run(Request::from_parts(parts, Body::from(request_bytes)))
        .await;

    let (parts, response_body) = response.into_parts();
    let response_bytes = match to_bytes(response_body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(target: "simulator", "{} {} response unreadable: {}", method, path, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    state.console.record(LogEntry {
        timestamp: Utc::now(),
        method,
        path,
        source_ip,
        body,
        status: parts.status.as_u16(),
        response: logged_body(&response_bytes).unwrap_or(Value::Null),
    });

    Response::from_parts(parts, Body::from(response_bytes))
}

/// Console copy of a body; the bytes on the wire are never altered
fn logged_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    if bytes.len() > MAX_LOGGED_BODY {
        return Some(Value::String(format!("<{} bytes>", bytes.len())));
    }
    Some(parse_body(bytes).unwrap_or_else(|| {
        Value::String(String::from_utf8_lossy(bytes).into_owned())
    }))
}

fn parse_body(bytes: &[u8]) -> Option<Value> {
    serde_json::from_slice(bytes).ok()
}
