//! Controller against the simulated display

use std::sync::{Arc, Mutex};

use alamira_connect::app::options::AppOptions;
use alamira_connect::app::run::{run, Command, OnboardRequest};
use alamira_connect::app::state::AppState;
use alamira_connect::errors::ConnectError;
use alamira_connect::http::transport::{HttpTransport, Transport};
use alamira_connect::onboarding::{OnboardingMachine, OnboardingOptions, OnboardingStep};
use alamira_connect::provisioning::ProvisioningService;
use alamira_connect::registry::{DeviceRegistry, MemoryStore};
use alamira_simulator::server::{router, serve, ServerOptions};
use alamira_simulator::state::{SimulatorOptions, SimulatorState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::Router;
use device_api::WifiSecurity;
use http::{Method, Request};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::mock::DEMO_QR;

/// Serves every call from the simulator router in-process, whatever the host
struct RouterTransport {
    router: Router,
    targets: Mutex<Vec<String>>,
}

impl RouterTransport {
    fn new(state: Arc<SimulatorState>) -> Arc<Self> {
        Arc::new(Self {
            router: router(state),
            targets: Mutex::new(Vec::new()),
        })
    }

    fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RouterTransport {
    async fn call(
        &self,
        method: Method,
        host: &str,
        port: u16,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ConnectError> {
        self.targets
            .lock()
            .unwrap()
            .push(format!("{} {}:{}{}", method, host, port, path));

        let body = match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .map_err(|e| ConnectError::Internal(e.to_string()))?;

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ConnectError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ConnectError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// The simulator dressed up as ALM-DEMO-001
fn demo_display(advertised_ip: &str) -> Arc<SimulatorState> {
    Arc::new(SimulatorState::new(SimulatorOptions {
        device_id: "ALM-DEMO-001".to_string(),
        model: "Alamira MFD-7".to_string(),
        firmware_version: "1.2.0".to_string(),
        serial: "ALM-2026-DEMO-001".to_string(),
        advertised_ip: advertised_ip.to_string(),
        ..Default::default()
    }))
}

fn machine(transport: Arc<dyn Transport>) -> OnboardingMachine {
    OnboardingMachine::new(
        ProvisioningService::new(transport),
        Arc::new(DeviceRegistry::new(Arc::new(MemoryStore::new()))),
        OnboardingOptions::default(),
    )
}

#[tokio::test]
async fn test_onboard_simulated_display() {
    let display = demo_display("192.168.1.100");
    let transport = RouterTransport::new(display.clone());
    let machine = machine(transport.clone());

    let device = machine.handle_qr_scan(DEMO_QR).await.unwrap();
    assert_eq!(device.model, "Alamira MFD-7");

    machine.continue_from_product_info().await.unwrap();
    let session = machine.session().await;
    assert_eq!(session.networks.len(), 3);
    let open = session
        .networks
        .iter()
        .find(|n| n.security == WifiSecurity::Open)
        .cloned()
        .unwrap();
    assert_eq!(open.ssid, "Guest_Open");

    let verified = machine.connect_to_network(&open, None).await.unwrap();
    assert_eq!(verified.device_id, "ALM-DEMO-001");
    assert_eq!(
        machine.session().await.assigned_ip.as_deref(),
        Some("192.168.1.100")
    );

    machine.name_device("Helm Display").await.unwrap();
    machine.complete_onboarding().await.unwrap();
    assert_eq!(machine.step().await, OnboardingStep::Complete);

    let devices = machine.registry().list().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "ALM-DEMO-001");
    assert_eq!(devices[0].name, "Helm Display");
    assert_eq!(devices[0].ip, "192.168.1.100");
    assert_eq!(devices[0].port, 8080);

    assert_eq!(
        transport.targets(),
        vec![
            "GET 192.168.4.1:8080/api/info",
            "GET 192.168.4.1:8080/api/wifi/scan",
            "POST 192.168.4.1:8080/api/provision",
            "GET 192.168.1.100:8080/api/info",
        ]
    );

    // the display saw exactly what was sent
    let console = display.console.entries();
    assert_eq!(console.len(), 4);
    assert_eq!(
        console[2].body,
        Some(json!({ "ssid": "Guest_Open", "password": "" }))
    );
    assert_eq!(
        console[2].response,
        json!({ "success": true, "ip": "192.168.1.100" })
    );
    assert_eq!(display.status().await.ssid, "Guest_Open");
}

#[tokio::test]
async fn test_cli_commands_against_simulated_display() {
    let display = demo_display("192.168.1.100");
    let state = AppState::with_parts(
        &AppOptions::default(),
        Arc::new(MemoryStore::new()),
        RouterTransport::new(display),
    );

    let paired = run(
        &state,
        Command::Onboard(OnboardRequest {
            qr: Some(DEMO_QR.to_string()),
            ssid: "Marina_WiFi".to_string(),
            password: Some("harbour".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    // unnamed devices take their model name
    assert_eq!(paired["name"], "Alamira MFD-7");
    assert_eq!(paired["ip"], "192.168.1.100");

    let status = run(
        &state,
        Command::Status {
            id: "ALM-DEMO-001".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(status["ssid"], "Marina_WiFi");
    assert_eq!(status["wifi_rssi"], -45);

    run(
        &state,
        Command::Rename {
            id: "ALM-DEMO-001".to_string(),
            name: "Salon".to_string(),
        },
    )
    .await
    .unwrap();
    let listed = run(&state, Command::List).await.unwrap();
    assert_eq!(listed[0]["name"], "Salon");

    let removed = run(
        &state,
        Command::Remove {
            id: "ALM-DEMO-001".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(removed["removed"], true);
    assert_eq!(run(&state, Command::List).await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_unknown_network_is_reported() {
    let state = AppState::with_parts(
        &AppOptions::default(),
        Arc::new(MemoryStore::new()),
        RouterTransport::new(demo_display("192.168.1.100")),
    );

    let result = run(
        &state,
        Command::Onboard(OnboardRequest {
            qr: Some(DEMO_QR.to_string()),
            ssid: "Nowhere".to_string(),
            ..Default::default()
        }),
    )
    .await;
    assert!(matches!(result, Err(ConnectError::NotFound(_))));
    assert_eq!(state.onboarding.step().await, OnboardingStep::WifiSetup);
}

#[tokio::test]
async fn test_onboard_over_loopback() {
    let display = demo_display("127.0.0.1");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let (addr, server) = serve(
        &ServerOptions {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        display.clone(),
        async move {
            let _ = shutdown_rx.await;
        },
    )
    .await
    .unwrap();

    let qr = json!({
        "ap_ssid": "ALAMIRA-SIM",
        "ap_pass": "simulator",
        "device_id": "ALM-DEMO-001",
        "api_port": addr.port(),
        "ip": "127.0.0.1"
    })
    .to_string();

    let machine = machine(Arc::new(HttpTransport::new().unwrap()));
    machine.handle_qr_scan(&qr).await.unwrap();
    machine.continue_from_product_info().await.unwrap();
    machine
        .send_credentials("HomeNetwork", "correct horse")
        .await
        .unwrap();
    machine.name_device("Helm Display").await.unwrap();
    let paired = machine.complete_onboarding().await.unwrap();

    assert_eq!(paired.ip, "127.0.0.1");
    assert_eq!(paired.port, addr.port());

    let console = display.console.entries();
    assert_eq!(console.len(), 4);
    assert!(console
        .iter()
        .all(|e| e.source_ip.as_deref() == Some("127.0.0.1")));

    // a request the display does not know
    let transport = HttpTransport::new().unwrap();
    let err = transport
        .call(Method::GET, "127.0.0.1", addr.port(), "/api/reboot", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::Http { status: 404, .. }));

    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
