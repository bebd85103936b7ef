//! HTTP server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use device_api::paths;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::SimulatorError;
use crate::server::handlers::{
    info_handler, message_handler, not_found_handler, provision_handler, record_exchange,
    scan_handler, status_handler,
};
use crate::state::SimulatorState;

/// Listen address
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// The device control API
pub fn router(state: Arc<SimulatorState>) -> Router {
    Router::new()
        .route(paths::INFO, get(info_handler))
        .route(paths::WIFI_SCAN, get(scan_handler))
        .route(paths::PROVISION, post(provision_handler))
        .route(paths::STATUS, get(status_handler))
        .route(paths::MESSAGE, post(message_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), record_exchange))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server, returning the bound address and the server task
pub async fn serve(
    options: &ServerOptions,
    state: Arc<SimulatorState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, JoinHandle<Result<(), SimulatorError>>), SimulatorError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| SimulatorError::BindError {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;
    info!(target: "simulator", "Device API listening on {}", local_addr);

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| SimulatorError::ServerError(e.to_string()))
    });

    Ok((local_addr, handle))
}
