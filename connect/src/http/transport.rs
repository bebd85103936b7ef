//! HTTP transport to the device control API

use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::Method;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::errors::ConnectError;

/// Per-call timeout used when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A single request/response exchange with a device.
///
/// Implementations must not retry and must not touch shared state; retry
/// policy belongs to the onboarding flow.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        method: Method,
        host: &str,
        port: u16,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ConnectError>;
}

/// Build the URL of a control API endpoint
pub fn build_url(host: &str, port: u16, path: &str) -> Result<Url, ConnectError> {
    let base = Url::parse(&format!("http://{}:{}", host, port))?;
    Ok(base.join(path)?)
}

/// reqwest-backed transport with a bounded per-call timeout
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default 10 second timeout
    pub fn new() -> Result<Self, ConnectError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom per-call timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, ConnectError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        method: Method,
        host: &str,
        port: u16,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ConnectError> {
        let url = build_url(host, port, path)?;
        debug!(target: "wifi", "{} {}", method, url);

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = &body {
            request = request.json(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ConnectError::Timeout {
                    method: method.to_string(),
                    url: url.to_string(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            } else {
                ConnectError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ConnectError::Timeout {
                    method: method.to_string(),
                    url: url.to_string(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            } else {
                ConnectError::Network(e.to_string())
            }
        })?;

        if !status.is_success() {
            error!(target: "wifi", "{} {} failed: {} - {}", method, url, status, text);
            return Err(ConnectError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}
