//! Alamira Display Simulator - Entry Point
//!
//! Serves the device control API on a local port so the onboarding flow can be
//! exercised without a physical display.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use alamira_simulator::network::advertised_ip;
use alamira_simulator::server::{serve, ServerOptions};
use alamira_simulator::state::{SimulatorOptions, SimulatorState};
use alamira_simulator::utils::parse_cli_args;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = parse_cli_args(env::args().skip(1));

    let log_level = cli_args
        .get("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut server = ServerOptions::default();
    if let Some(host) = cli_args.get("host") {
        server.host = host.clone();
    }
    if let Some(port) = cli_args.get("port") {
        match port.parse() {
            Ok(port) => server.port = port,
            Err(_) => {
                error!("Invalid --port: {}", port);
                return ExitCode::FAILURE;
            }
        }
    }

    let state = Arc::new(SimulatorState::new(SimulatorOptions {
        advertised_ip: advertised_ip(cli_args.get("ip").map(String::as_str)),
        ..Default::default()
    }));

    let (addr, handle) = match serve(&server, state.clone(), await_shutdown_signal()).await {
        Ok(started) => started,
        Err(e) => {
            error!("Failed to start the simulator: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string(&state.qr_payload(addr.port()).await) {
        Ok(qr) => info!(target: "simulator", "QR payload: {}", qr),
        Err(e) => error!("Failed to encode QR payload: {e}"),
    }

    match handle.await {
        Ok(Ok(())) => {
            info!("Simulator stopped after {} requests", state.console.len());
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Server task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
