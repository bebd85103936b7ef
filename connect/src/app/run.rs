//! Command line actions

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::info;

use crate::app::state::AppState;
use crate::errors::ConnectError;
use crate::onboarding::{OnboardingMachine, OnboardingStep};
use crate::registry::{ConnectionType, NewConnection, PairedDevice};

/// Headless onboarding parameters
#[derive(Debug, Clone, Default)]
pub struct OnboardRequest {
    /// Raw QR string; ignored in demo runs
    pub qr: Option<String>,

    /// Onboard the built-in simulated device
    pub demo: bool,

    /// Target network
    pub ssid: String,

    pub password: Option<String>,

    /// Device name; defaults to the model
    pub name: Option<String>,

    /// Accept an offered firmware update instead of skipping it
    pub update_firmware: bool,
}

/// What the CLI was asked to do
#[derive(Debug, Clone)]
pub enum Command {
    Onboard(OnboardRequest),
    List,
    Remove { id: String },
    Rename { id: String, name: String },
    Status { id: String },
    Link { id: String, connection: NewConnection },
    Unlink { id: String, connection_id: String },
}

impl Command {
    pub fn from_args(cli_args: &HashMap<String, String>) -> Result<Self, ConnectError> {
        let arg = |key: &str| cli_args.get(key).cloned();
        let required = |key: &str| {
            arg(key).ok_or_else(|| ConnectError::ConfigError(format!("Missing --{}=<value>", key)))
        };

        if cli_args.contains_key("list") {
            return Ok(Command::List);
        }
        if let Some(id) = arg("remove") {
            return Ok(Command::Remove { id });
        }
        if let Some(id) = arg("rename") {
            return Ok(Command::Rename {
                id,
                name: required("name")?,
            });
        }
        if let Some(id) = arg("status") {
            return Ok(Command::Status { id });
        }
        if let Some(id) = arg("link") {
            let kind: ConnectionType = required("type")?
                .parse()
                .map_err(ConnectError::ConfigError)?;
            let port = match arg("port") {
                Some(port) => Some(port.parse::<u16>().map_err(|_| {
                    ConnectError::ConfigError(format!("Invalid --port: {}", port))
                })?),
                None => None,
            };
            return Ok(Command::Link {
                id,
                connection: NewConnection {
                    kind,
                    host: required("host")?,
                    port,
                    name: arg("name"),
                },
            });
        }
        if let Some(id) = arg("unlink") {
            return Ok(Command::Unlink {
                id,
                connection_id: required("connection")?,
            });
        }

        let demo = cli_args.contains_key("demo");
        let qr = arg("qr");
        if qr.is_none() && !demo {
            return Err(ConnectError::ConfigError(
                "Nothing to do: pass --qr=<payload>, --demo, --list, --remove, --rename, --status, --link or --unlink"
                    .to_string(),
            ));
        }

        Ok(Command::Onboard(OnboardRequest {
            qr,
            demo,
            ssid: required("ssid")?,
            password: arg("password"),
            name: arg("name"),
            update_firmware: cli_args.contains_key("update-firmware"),
        }))
    }
}

/// Execute a command, returning the JSON to print
pub async fn run(state: &AppState, command: Command) -> Result<Value, ConnectError> {
    match command {
        Command::Onboard(request) => {
            let device = onboard(&state.onboarding, &request).await?;
            Ok(serde_json::to_value(device)?)
        }
        Command::List => Ok(serde_json::to_value(state.registry.list().await?)?),
        Command::Remove { id } => {
            let removed = state.registry.remove(&id).await?;
            Ok(json!({ "id": id, "removed": removed }))
        }
        Command::Rename { id, name } => {
            let device = state
                .registry
                .rename(&id, &name)
                .await?
                .ok_or_else(|| ConnectError::NotFound(format!("device {}", id)))?;
            Ok(serde_json::to_value(device)?)
        }
        Command::Status { id } => {
            let device = paired(state, &id).await?;
            let status = state
                .provisioning
                .device_status(&device.ip, device.port)
                .await?;
            Ok(serde_json::to_value(status)?)
        }
        Command::Link { id, connection } => {
            let linked = state
                .registry
                .link_connection(&id, connection)
                .await?
                .ok_or_else(|| ConnectError::NotFound(format!("device {}", id)))?;
            Ok(serde_json::to_value(linked)?)
        }
        Command::Unlink { id, connection_id } => {
            let removed = state.registry.unlink_connection(&id, &connection_id).await?;
            Ok(json!({ "id": id, "connection": connection_id, "removed": removed }))
        }
    }
}

async fn paired(state: &AppState, id: &str) -> Result<PairedDevice, ConnectError> {
    state
        .registry
        .get(id)
        .await?
        .ok_or_else(|| ConnectError::NotFound(format!("device {}", id)))
}

/// Walk one session from QR code to a paired device without user interaction
pub async fn onboard(
    machine: &OnboardingMachine,
    request: &OnboardRequest,
) -> Result<PairedDevice, ConnectError> {
    if request.demo {
        machine.simulate_device().await?;
    } else {
        let qr = request
            .qr
            .as_deref()
            .ok_or_else(|| ConnectError::ConfigError("Missing --qr=<payload>".to_string()))?;
        machine.handle_qr_scan(qr).await?;
    }

    if machine.continue_from_product_info().await? == OnboardingStep::FirmwareUpdate {
        if request.update_firmware {
            machine.apply_firmware_update().await?;
            machine.advance_past_firmware().await?;
        } else {
            machine.skip_firmware_update().await?;
        }
    }

    let session = machine.session().await;
    let network = session.network(&request.ssid).cloned().ok_or_else(|| {
        ConnectError::NotFound(format!("network \"{}\" is not visible to the device", request.ssid))
    })?;
    info!(
        target: "onboarding",
        "Joining {} ({}, {})", network.ssid, network.security, network.signal_label()
    );
    machine
        .connect_to_network(&network, request.password.as_deref())
        .await?;

    let name = match &request.name {
        Some(name) => name.clone(),
        None => machine.session().await.device_name,
    };
    machine.name_device(&name).await?;

    machine.complete_onboarding().await
}
