//! Onboarding state machine tests

use std::sync::Arc;
use std::time::Duration;

use alamira_connect::errors::ConnectError;
use alamira_connect::onboarding::{
    FirmwareProgressOptions, OnboardingMachine, OnboardingOptions, OnboardingSession,
    OnboardingStep,
};
use alamira_connect::provisioning::ProvisioningService;
use alamira_connect::registry::{DeviceRegistry, MemoryStore};
use device_api::{WifiNetwork, WifiSecurity};
use http::Method;
use serde_json::json;
use tokio_test::assert_ok;

use crate::mock::{device_info, MockTransport, DEMO_QR};

fn machine_with(mock: &Arc<MockTransport>, options: OnboardingOptions) -> Arc<OnboardingMachine> {
    let registry = Arc::new(DeviceRegistry::new(Arc::new(MemoryStore::new())));
    let service = ProvisioningService::new(mock.clone());
    Arc::new(OnboardingMachine::new(service, registry, options))
}

fn machine(mock: &Arc<MockTransport>) -> Arc<OnboardingMachine> {
    machine_with(mock, OnboardingOptions::default())
}

fn fast_firmware(latest: &str) -> OnboardingOptions {
    OnboardingOptions {
        latest_firmware: Some(latest.to_string()),
        firmware_progress: FirmwareProgressOptions {
            increment: 25,
            tick: Duration::from_millis(1),
        },
        ..Default::default()
    }
}

/// Scan and continue to WiFi setup
async fn at_wifi_setup(machine: &OnboardingMachine) {
    assert_ok!(machine.handle_qr_scan(DEMO_QR).await);
    assert_eq!(
        machine.continue_from_product_info().await.unwrap(),
        OnboardingStep::WifiSetup
    );
}

fn open_network() -> WifiNetwork {
    WifiNetwork::new("Guest_Open", -71, WifiSecurity::Open)
}

fn secured_network() -> WifiNetwork {
    WifiNetwork::new("Marina_WiFi", -58, WifiSecurity::Wpa2)
}

#[tokio::test]
async fn test_full_flow() {
    let mock = MockTransport::device();
    let machine = machine(&mock);

    let device = machine.handle_qr_scan(DEMO_QR).await.unwrap();
    assert_eq!(device.model, "Alamira MFD-7");
    assert_eq!(machine.step().await, OnboardingStep::ProductInfo);

    assert_eq!(
        machine.continue_from_product_info().await.unwrap(),
        OnboardingStep::WifiSetup
    );
    let session = machine.session().await;
    assert_eq!(session.networks.len(), 3);
    assert!(!session.is_loading);

    let network = session.network("Guest_Open").cloned().unwrap();
    machine.connect_to_network(&network, None).await.unwrap();

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::Name);
    assert_eq!(session.assigned_ip.as_deref(), Some("192.168.1.100"));
    assert_eq!(session.selected_ssid.as_deref(), Some("Guest_Open"));
    assert_eq!(session.device_name, "Alamira MFD-7");

    machine.name_device("  Helm Display ").await.unwrap();
    assert_eq!(machine.step().await, OnboardingStep::Configure);

    let paired = machine.complete_onboarding().await.unwrap();
    assert_eq!(paired.id, "ALM-DEMO-001");
    assert_eq!(paired.name, "Helm Display");
    assert_eq!(paired.ip, "192.168.1.100");
    assert_eq!(paired.port, 8080);
    assert_eq!(machine.step().await, OnboardingStep::Complete);

    let devices = machine.registry().list().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, paired.id);
    assert_eq!(devices[0].name, "Helm Display");
    assert_eq!(devices[0].serial, "ALM-2026-0042");

    // identify and scan over the AP, provision over the AP, verify on the new address
    let calls = mock.calls();
    let route: Vec<_> = calls
        .iter()
        .map(|c| (c.method.clone(), c.host.as_str(), c.path.as_str()))
        .collect();
    assert_eq!(
        route,
        vec![
            (Method::GET, "192.168.4.1", "/api/info"),
            (Method::GET, "192.168.4.1", "/api/wifi/scan"),
            (Method::POST, "192.168.4.1", "/api/provision"),
            (Method::GET, "192.168.1.100", "/api/info"),
        ]
    );
    assert!(calls.iter().all(|c| c.port == 8080));
}

#[tokio::test]
async fn test_invalid_qr_stays_at_scan() {
    let mock = MockTransport::device();
    let machine = machine(&mock);

    let err = machine.handle_qr_scan("not a qr code").await.unwrap_err();
    assert!(matches!(err, ConnectError::InvalidPayload(_)));

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::Scan);
    assert_eq!(session.error.as_deref(), Some("Invalid QR code"));
    assert!(session.qr_data.is_none());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_identify_failure_returns_to_scan() {
    let mock = MockTransport::device();
    mock.fail(Method::GET, "/api/info", "connection refused");
    let machine = machine(&mock);

    let err = machine.handle_qr_scan(DEMO_QR).await.unwrap_err();
    assert!(err.is_transport());

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::Scan);
    assert!(session.error.is_some());
    assert!(session.qr_data.is_none());
    assert!(session.device_info.is_none());
    assert!(!session.is_loading);
}

#[tokio::test]
async fn test_scan_failure_stays_at_product_info() {
    let mock = MockTransport::device();
    mock.fail(Method::GET, "/api/wifi/scan", "timed out");
    let machine = machine(&mock);

    machine.handle_qr_scan(DEMO_QR).await.unwrap();
    assert!(machine.continue_from_product_info().await.is_err());

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::ProductInfo);
    assert!(session.error.is_some());
    assert!(session.device_info.is_some());
}

#[tokio::test]
async fn test_empty_scan_is_valid() {
    let mock = MockTransport::device();
    mock.reply(Method::GET, "/api/wifi/scan", json!({ "networks": [] }));
    let machine = machine(&mock);

    at_wifi_setup(&machine).await;
    assert!(machine.session().await.networks.is_empty());
}

#[tokio::test]
async fn test_open_network_sends_empty_password() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;

    machine
        .connect_to_network(&open_network(), Some("ignored"))
        .await
        .unwrap();

    let provision = mock.calls_to("/api/provision");
    assert_eq!(provision.len(), 1);
    assert_eq!(
        provision[0].body,
        Some(json!({ "ssid": "Guest_Open", "password": "" }))
    );
}

#[tokio::test]
async fn test_secured_network_without_password_makes_no_call() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;

    for password in [None, Some("")] {
        let err = machine
            .connect_to_network(&secured_network(), password)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::ValidationError(_)));
    }

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::WifiSetup);
    assert!(session.error.is_some());
    assert!(mock.calls_to("/api/provision").is_empty());

    machine
        .connect_to_network(&secured_network(), Some("harbour"))
        .await
        .unwrap();
    assert_eq!(
        mock.calls_to("/api/provision")[0].body,
        Some(json!({ "ssid": "Marina_WiFi", "password": "harbour" }))
    );
}

#[tokio::test]
async fn test_provisioning_rejected_returns_to_wifi_setup() {
    let mock = MockTransport::device();
    mock.reply(
        Method::POST,
        "/api/provision",
        json!({ "success": false, "ip": "" }),
    );
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;

    let err = machine
        .send_credentials("Marina_WiFi", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::ProvisioningFailed { .. }));

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::WifiSetup);
    assert!(session.error.is_some());
    assert!(!session.is_loading);
    assert!(session.assigned_ip.is_none());
}

#[tokio::test]
async fn test_verify_failure_returns_to_wifi_setup() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;

    // the device never shows up on the target network
    mock.fail(Method::GET, "/api/info", "no route to host");
    assert!(machine.send_credentials("Guest_Open", "").await.is_err());

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::WifiSetup);
    assert!(session.error.is_some());

    // a retry from the same step succeeds once the device answers
    mock.reply(Method::GET, "/api/info", device_info("ALM-DEMO-001"));
    machine.send_credentials("Guest_Open", "").await.unwrap();
    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::Name);
    assert!(session.error.is_none());
}

#[tokio::test]
async fn test_verify_tolerates_identity_change() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;

    mock.reply(Method::GET, "/api/info", device_info("ALM-OTHER-002"));
    let device = machine.send_credentials("Guest_Open", "").await.unwrap();
    assert_eq!(device.device_id, "ALM-OTHER-002");
    assert_eq!(machine.step().await, OnboardingStep::Name);
}

#[tokio::test]
async fn test_actions_out_of_order_are_rejected() {
    let mock = MockTransport::device();
    let machine = machine(&mock);

    assert!(matches!(
        machine.continue_from_product_info().await,
        Err(ConnectError::InvalidTransition { step: OnboardingStep::Scan, .. })
    ));
    assert!(machine.name_device("Helm").await.is_err());
    assert!(machine.complete_onboarding().await.is_err());
    assert!(machine.send_credentials("Guest_Open", "").await.is_err());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;
    machine.send_credentials("Guest_Open", "").await.unwrap();

    let err = machine.name_device("   ").await.unwrap_err();
    assert!(matches!(err, ConnectError::ValidationError(_)));
    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::Name);
    assert!(session.error.is_some());
}

#[tokio::test]
async fn test_cancel_resets_every_field() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;
    machine.send_credentials("Guest_Open", "").await.unwrap();

    machine.cancel().await.unwrap();

    let session = machine.session().await;
    assert_eq!(session, OnboardingSession::default());
    assert_eq!(session.step, OnboardingStep::Scan);
    assert!(session.qr_data.is_none());
    assert!(session.device_info.is_none());
    assert!(session.networks.is_empty());
    assert!(session.error.is_none());
    assert!(!session.is_loading);
}

#[tokio::test]
async fn test_cancel_at_complete_is_rejected() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;
    machine.send_credentials("Guest_Open", "").await.unwrap();
    machine.name_device("Helm Display").await.unwrap();
    machine.complete_onboarding().await.unwrap();

    assert!(matches!(
        machine.cancel().await,
        Err(ConnectError::InvalidTransition { step: OnboardingStep::Complete, .. })
    ));

    machine.reset().await;
    assert_eq!(machine.session().await, OnboardingSession::default());
    assert_eq!(machine.registry().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_busy_session_rejects_actions_and_drops_stale_result() {
    let mock = MockTransport::device();
    let (entered, release) = mock.hold("/api/info");
    let machine = machine(&mock);

    let pending = {
        let machine = machine.clone();
        tokio::spawn(async move { machine.handle_qr_scan(DEMO_QR).await })
    };
    entered.notified().await;

    let session = machine.session().await;
    assert_eq!(session.step, OnboardingStep::Connecting);
    assert!(session.is_loading);

    assert!(matches!(
        machine.handle_qr_scan(DEMO_QR).await,
        Err(ConnectError::Busy)
    ));
    assert!(matches!(
        machine.continue_from_product_info().await,
        Err(ConnectError::Busy)
    ));

    machine.cancel().await.unwrap();
    release.notify_one();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(ConnectError::Cancelled)));
    assert_eq!(machine.session().await, OnboardingSession::default());
}

#[tokio::test]
async fn test_firmware_update_flow() {
    let mock = MockTransport::device();
    let machine = machine_with(&mock, fast_firmware("1.3.0"));

    machine.handle_qr_scan(DEMO_QR).await.unwrap();
    assert_eq!(
        machine.continue_from_product_info().await.unwrap(),
        OnboardingStep::FirmwareUpdate
    );
    let update = machine.session().await.firmware_update.unwrap();
    assert_eq!(update.current_version, "1.2.0");
    assert_eq!(update.available_version, "1.3.0");

    // cannot move on before the indicator finishes
    assert!(matches!(
        machine.advance_past_firmware().await,
        Err(ConnectError::ValidationError(_))
    ));
    assert_eq!(machine.step().await, OnboardingStep::FirmwareUpdate);

    machine.apply_firmware_update().await.unwrap();
    let session = machine.session().await;
    assert_eq!(session.firmware_progress, 100);
    assert!(!session.is_loading);

    assert_eq!(
        machine.advance_past_firmware().await.unwrap(),
        OnboardingStep::WifiSetup
    );
    assert!(mock
        .calls()
        .iter()
        .all(|c| c.path != "/api/firmware"));
}

#[tokio::test]
async fn test_cancel_stops_firmware_progress() {
    let mock = MockTransport::device();
    let machine = machine_with(
        &mock,
        OnboardingOptions {
            latest_firmware: Some("1.3.0".to_string()),
            firmware_progress: FirmwareProgressOptions {
                increment: 10,
                tick: Duration::from_millis(40),
            },
            ..Default::default()
        },
    );

    machine.handle_qr_scan(DEMO_QR).await.unwrap();
    machine.continue_from_product_info().await.unwrap();

    let progress = {
        let machine = machine.clone();
        tokio::spawn(async move { machine.apply_firmware_update().await })
    };

    // wait for the first tick to land
    tokio::time::timeout(Duration::from_secs(5), async {
        while machine.session().await.firmware_progress == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(machine.session().await.firmware_progress < 100);

    machine.cancel().await.unwrap();

    let result = progress.await.unwrap();
    assert!(matches!(result, Err(ConnectError::Cancelled)));
    assert_eq!(machine.session().await, OnboardingSession::default());

    // several ticks later nothing has moved
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(machine.session().await, OnboardingSession::default());
}

#[tokio::test]
async fn test_skip_firmware_update() {
    let mock = MockTransport::device();
    let machine = machine_with(&mock, fast_firmware("2.0.0"));

    machine.handle_qr_scan(DEMO_QR).await.unwrap();
    machine.continue_from_product_info().await.unwrap();
    assert_eq!(
        machine.skip_firmware_update().await.unwrap(),
        OnboardingStep::WifiSetup
    );
    assert_eq!(machine.session().await.firmware_progress, 0);
}

#[tokio::test]
async fn test_current_firmware_skips_update_step() {
    let mock = MockTransport::device();
    let machine = machine_with(&mock, fast_firmware("1.2.0"));
    at_wifi_setup(&machine).await;
}

#[tokio::test]
async fn test_rescan_replaces_networks() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    at_wifi_setup(&machine).await;

    mock.reply(
        Method::GET,
        "/api/wifi/scan",
        json!({ "networks": [{ "ssid": "Fuel_Dock", "rssi": -80, "security": "WPA3" }] }),
    );
    machine.rescan_networks().await.unwrap();

    let session = machine.session().await;
    assert_eq!(session.networks.len(), 1);
    assert_eq!(session.networks[0].signal_label(), "Weak");
    assert_eq!(mock.calls_to("/api/wifi/scan").len(), 2);
}

#[tokio::test]
async fn test_demo_session_needs_demo_mode() {
    let mock = MockTransport::device();
    let machine = machine(&mock);
    assert!(matches!(
        machine.simulate_device().await,
        Err(ConnectError::ConfigError(_))
    ));
}

#[tokio::test]
async fn test_demo_session_without_network_traffic() {
    let mock = MockTransport::device();
    let machine = machine_with(
        &mock,
        OnboardingOptions {
            demo_mode: true,
            ..fast_firmware("9.9.9")
        },
    );

    let device = machine.simulate_device().await.unwrap();
    assert_eq!(device.device_id, "ALM-DEMO-001");
    assert!(machine.session().await.demo);

    // the simulated display always offers its own update
    assert_eq!(
        machine.continue_from_product_info().await.unwrap(),
        OnboardingStep::FirmwareUpdate
    );
    machine.skip_firmware_update().await.unwrap();
    assert_eq!(machine.session().await.networks.len(), 3);

    machine
        .connect_to_network(&secured_network(), Some("harbour"))
        .await
        .unwrap();
    machine.name_device("Demo Helm").await.unwrap();
    let paired = machine.complete_onboarding().await.unwrap();

    assert_eq!(paired.id, "ALM-DEMO-001");
    assert_eq!(paired.ip, "192.168.1.100");
    assert_eq!(paired.port, 8080);
    assert!(mock.calls().is_empty());
}
