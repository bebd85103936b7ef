//! Onboarding state machine
//!
//! Owns the single live [`OnboardingSession`] and exposes the actions the
//! screens call. The session sits behind a mutex that is never held across a
//! network call. Every reset bumps a session token; a remote result is applied
//! only if the token it started under is still current, so answers to a
//! cancelled attempt are dropped.
//!
//! Legal path:
//! `scan → connecting → product-info → [firmware-update] → wifi-setup →
//! verifying → name → configure → complete`.
//! A failed remote call returns to the step before the operation, never
//! further back than needed.

use std::sync::Arc;

use device_api::{DeviceInfo, WifiNetwork};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::ConnectError;
use crate::onboarding::firmware::{FirmwareProgressOptions, FirmwareUpdateInfo};
use crate::onboarding::session::OnboardingSession;
use crate::onboarding::step::OnboardingStep;
use crate::provisioning::demo::SimulatedDevice;
use crate::provisioning::ProvisioningService;
use crate::qr::decode_qr_payload;
use crate::registry::{DeviceRegistry, PairedDevice};

/// Onboarding behaviour settings
#[derive(Debug, Clone, Default)]
pub struct OnboardingOptions {
    /// Allow [`OnboardingMachine::simulate_device`]
    pub demo_mode: bool,

    /// Newest firmware release known to the controller
    pub latest_firmware: Option<String>,

    pub firmware_progress: FirmwareProgressOptions,
}

struct Inner {
    session: OnboardingSession,
    token: u64,
}

/// Session snapshot taken when an operation starts
struct Attempt {
    token: u64,
    session: OnboardingSession,
}

pub struct OnboardingMachine {
    service: ProvisioningService,
    registry: Arc<DeviceRegistry>,
    options: OnboardingOptions,
    demo_device: SimulatedDevice,
    inner: Mutex<Inner>,
}

impl OnboardingMachine {
    pub fn new(
        service: ProvisioningService,
        registry: Arc<DeviceRegistry>,
        options: OnboardingOptions,
    ) -> Self {
        Self {
            service,
            registry,
            options,
            demo_device: SimulatedDevice::default(),
            inner: Mutex::new(Inner {
                session: OnboardingSession::new(),
                token: 0,
            }),
        }
    }

    /// Copy of the current session
    pub async fn session(&self) -> OnboardingSession {
        self.inner.lock().await.session.clone()
    }

    pub async fn step(&self) -> OnboardingStep {
        self.inner.lock().await.session.step
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------ //
    // Actions
    // ------------------------------------------------------------------ //

    /// Start a new session from a scanned QR string and identify the device
    /// over its access point. Any prior session is discarded first.
    pub async fn handle_qr_scan(&self, raw: &str) -> Result<DeviceInfo, ConnectError> {
        let (attempt, qr) = {
            let mut inner = self.inner.lock().await;
            if inner.session.is_loading {
                return Err(ConnectError::Busy);
            }

            inner.token += 1;
            inner.session.reset();

            let qr = match decode_qr_payload(raw) {
                Ok(qr) => qr,
                Err(e) => {
                    warn!(target: "qr", "Rejected QR payload: {}", e);
                    inner.session.error = Some("Invalid QR code".to_string());
                    return Err(e);
                }
            };

            info!(target: "onboarding", "Scanned QR code of device {}", qr.device_id);
            inner.session.qr_data = Some(qr.clone());
            inner.session.step = OnboardingStep::Connecting;
            inner.session.is_loading = true;

            let attempt = Attempt {
                token: inner.token,
                session: inner.session.clone(),
            };
            (attempt, qr)
        };

        match self.service.connect_to_device(&qr).await {
            Ok(device) => {
                self.commit(attempt.token, |s| {
                    s.device_info = Some(device.clone());
                    s.step = OnboardingStep::ProductInfo;
                })
                .await?;
                Ok(device)
            }
            Err(e) => Err(self.fail(attempt.token, OnboardingStep::Scan, e).await),
        }
    }

    /// Seed a session with the built-in simulated display, without network
    /// traffic. Only available when demo mode is enabled.
    pub async fn simulate_device(&self) -> Result<DeviceInfo, ConnectError> {
        if !self.options.demo_mode {
            return Err(ConnectError::ConfigError("Demo mode is disabled".to_string()));
        }

        let mut inner = self.inner.lock().await;
        Self::ensure_idle_at(&inner.session, "simulate a device", &[OnboardingStep::Scan])?;

        inner.token += 1;
        inner.session.reset();
        inner.session.demo = true;
        inner.session.qr_data = Some(self.demo_device.qr_payload.clone());
        inner.session.device_info = Some(self.demo_device.device_info.clone());
        inner.session.step = OnboardingStep::ProductInfo;

        info!(target: "onboarding", "Started demo session with simulated device");
        Ok(self.demo_device.device_info.clone())
    }

    /// Leave the product info step: offer a firmware update when a newer
    /// release is known, otherwise scan networks and go to WiFi setup.
    pub async fn continue_from_product_info(&self) -> Result<OnboardingStep, ConnectError> {
        let attempt = self
            .begin("continue", &[OnboardingStep::ProductInfo], None)
            .await?;

        let firmware = self.check_firmware(&attempt.session);
        if firmware.update_available {
            info!(
                target: "onboarding",
                "Firmware update available: {} -> {}",
                firmware.current_version, firmware.available_version
            );
            self.commit(attempt.token, |s| {
                s.firmware_update = Some(firmware);
                s.firmware_progress = 0;
                s.step = OnboardingStep::FirmwareUpdate;
            })
            .await?;
            return Ok(OnboardingStep::FirmwareUpdate);
        }

        self.scan_into_wifi_setup(attempt, OnboardingStep::ProductInfo)
            .await
    }

    /// Decline the offered update and move on to WiFi setup
    pub async fn skip_firmware_update(&self) -> Result<OnboardingStep, ConnectError> {
        let attempt = self
            .begin("skip firmware update", &[OnboardingStep::FirmwareUpdate], None)
            .await?;
        info!(target: "onboarding", "Firmware update skipped");
        self.scan_into_wifi_setup(attempt, OnboardingStep::FirmwareUpdate)
            .await
    }

    /// Run the update progress indicator to completion. The indicator is a
    /// local timer; nothing is sent to the device.
    pub async fn apply_firmware_update(&self) -> Result<(), ConnectError> {
        let attempt = self
            .begin("apply firmware update", &[OnboardingStep::FirmwareUpdate], None)
            .await?;

        let available = attempt
            .session
            .firmware_update
            .as_ref()
            .is_some_and(|f| f.update_available);
        if !available {
            let err = ConnectError::ValidationError("No firmware update available".to_string());
            return Err(self.fail(attempt.token, OnboardingStep::FirmwareUpdate, err).await);
        }

        let increment = self.options.firmware_progress.increment.max(1);
        let mut ticker = tokio::time::interval(self.options.firmware_progress.tick);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let mut inner = self.inner.lock().await;
            if inner.token != attempt.token {
                debug!(target: "onboarding", "Firmware progress stopped by cancel");
                return Err(ConnectError::Cancelled);
            }

            let progress = inner.session.firmware_progress.saturating_add(increment).min(100);
            inner.session.firmware_progress = progress;
            if progress >= 100 {
                inner.session.is_loading = false;
                info!(target: "onboarding", "Firmware update complete");
                return Ok(());
            }
        }
    }

    /// Move on to WiFi setup once the update indicator reached 100%
    pub async fn advance_past_firmware(&self) -> Result<OnboardingStep, ConnectError> {
        let attempt = self
            .begin("continue", &[OnboardingStep::FirmwareUpdate], None)
            .await?;

        if attempt.session.firmware_progress < 100 {
            let err =
                ConnectError::ValidationError("Firmware update has not finished".to_string());
            return Err(self.fail(attempt.token, OnboardingStep::FirmwareUpdate, err).await);
        }

        self.scan_into_wifi_setup(attempt, OnboardingStep::FirmwareUpdate)
            .await
    }

    /// Replace the network list with a fresh scan
    pub async fn rescan_networks(&self) -> Result<OnboardingStep, ConnectError> {
        let attempt = self
            .begin("rescan networks", &[OnboardingStep::WifiSetup], None)
            .await?;
        self.scan_into_wifi_setup(attempt, OnboardingStep::WifiSetup)
            .await
    }

    /// Join a scanned network. Open networks are sent an empty password and
    /// never need one; secured networks fail without any network call when
    /// no password is given.
    pub async fn connect_to_network(
        &self,
        network: &WifiNetwork,
        password: Option<&str>,
    ) -> Result<DeviceInfo, ConnectError> {
        if !network.security.requires_password() {
            return self.send_credentials(&network.ssid, "").await;
        }

        match password {
            Some(password) if !password.is_empty() => {
                self.send_credentials(&network.ssid, password).await
            }
            _ => {
                let err = ConnectError::ValidationError(format!(
                    "Password required for {} network \"{}\"",
                    network.security, network.ssid
                ));
                Err(self.reject("send credentials", &[OnboardingStep::WifiSetup], err).await)
            }
        }
    }

    /// Hand the credentials to the device over its AP, then reach it at the
    /// address it was given on the target network. Any failure returns to
    /// WiFi setup.
    pub async fn send_credentials(&self, ssid: &str, password: &str) -> Result<DeviceInfo, ConnectError> {
        let ssid = ssid.trim();
        let attempt = self
            .begin(
                "send credentials",
                &[OnboardingStep::WifiSetup],
                Some(OnboardingStep::Verifying),
            )
            .await?;

        if ssid.is_empty() {
            let err = ConnectError::ValidationError("Select a network first".to_string());
            return Err(self.fail(attempt.token, OnboardingStep::WifiSetup, err).await);
        }

        {
            let mut inner = self.inner.lock().await;
            if inner.token == attempt.token {
                inner.session.selected_ssid = Some(ssid.to_string());
            }
        }

        let outcome = if attempt.session.demo {
            info!(target: "onboarding", "Demo session: simulating provisioning for \"{}\"", ssid);
            Ok((
                self.demo_device.assigned_ip(),
                self.demo_device.device_info.clone(),
            ))
        } else {
            self.provision_and_verify(&attempt, ssid, password).await
        };

        match outcome {
            Ok((assigned_ip, device)) => {
                self.commit(attempt.token, |s| {
                    s.assigned_ip = Some(assigned_ip);
                    if s.device_name.is_empty() {
                        s.device_name = device.model.clone();
                    }
                    s.device_info = Some(device.clone());
                    s.step = OnboardingStep::Name;
                })
                .await?;
                Ok(device)
            }
            Err(e) => Err(self.fail(attempt.token, OnboardingStep::WifiSetup, e).await),
        }
    }

    /// Submit the user-facing device name
    pub async fn name_device(&self, name: &str) -> Result<(), ConnectError> {
        let mut inner = self.inner.lock().await;
        Self::ensure_idle_at(&inner.session, "name the device", &[OnboardingStep::Name])?;

        let name = name.trim();
        if name.is_empty() {
            let err = ConnectError::ValidationError("Device name cannot be empty".to_string());
            inner.session.error = Some(err.to_string());
            return Err(err);
        }

        inner.session.error = None;
        inner.session.device_name = name.to_string();
        inner.session.step = OnboardingStep::Configure;
        Ok(())
    }

    /// Persist the paired device and finish the session
    pub async fn complete_onboarding(&self) -> Result<PairedDevice, ConnectError> {
        let attempt = self
            .begin("complete onboarding", &[OnboardingStep::Configure], None)
            .await?;

        let device = match self.paired_device(&attempt.session) {
            Ok(device) => device,
            Err(e) => return Err(self.fail(attempt.token, OnboardingStep::Configure, e).await),
        };

        if let Err(e) = self.registry.add(device.clone()).await {
            return Err(self.fail(attempt.token, OnboardingStep::Configure, e).await);
        }

        self.commit(attempt.token, |s| s.step = OnboardingStep::Complete)
            .await?;
        info!(
            target: "onboarding",
            "Onboarding complete: {} ({}) at {}:{}",
            device.name, device.id, device.ip, device.port
        );
        Ok(device)
    }

    /// Abandon the session. Legal from every step except `complete`; an
    /// in-flight call keeps running but its result is dropped.
    pub async fn cancel(&self) -> Result<(), ConnectError> {
        let mut inner = self.inner.lock().await;
        let step = inner.session.step;
        if step.is_terminal() {
            return Err(ConnectError::InvalidTransition {
                step,
                action: "cancel",
            });
        }

        inner.token += 1;
        inner.session.reset();
        info!(target: "onboarding", "Onboarding cancelled at step '{}'", step);
        Ok(())
    }

    /// Return to the initial state from any step, `complete` included
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.token += 1;
        inner.session.reset();
    }

    // ------------------------------------------------------------------ //
    // Internals
    // ------------------------------------------------------------------ //

    fn ensure_idle_at(
        session: &OnboardingSession,
        action: &'static str,
        from: &[OnboardingStep],
    ) -> Result<(), ConnectError> {
        if session.is_loading {
            return Err(ConnectError::Busy);
        }
        if !from.contains(&session.step) {
            return Err(ConnectError::InvalidTransition {
                step: session.step,
                action,
            });
        }
        Ok(())
    }

    /// Claim the session for a remote operation
    async fn begin(
        &self,
        action: &'static str,
        from: &[OnboardingStep],
        enter: Option<OnboardingStep>,
    ) -> Result<Attempt, ConnectError> {
        let mut inner = self.inner.lock().await;
        Self::ensure_idle_at(&inner.session, action, from)?;

        inner.session.error = None;
        inner.session.is_loading = true;
        if let Some(step) = enter {
            inner.session.step = step;
        }

        debug!(target: "onboarding", "Begin '{}' at step '{}'", action, inner.session.step);
        Ok(Attempt {
            token: inner.token,
            session: inner.session.clone(),
        })
    }

    /// Apply a successful result if the attempt is still current
    async fn commit<F>(&self, token: u64, apply: F) -> Result<(), ConnectError>
    where
        F: FnOnce(&mut OnboardingSession),
    {
        let mut inner = self.inner.lock().await;
        if inner.token != token {
            debug!(target: "onboarding", "Dropping result of a cancelled attempt");
            return Err(ConnectError::Cancelled);
        }

        apply(&mut inner.session);
        inner.session.is_loading = false;
        Ok(())
    }

    /// Record a failure and roll back to `to`
    async fn fail(&self, token: u64, to: OnboardingStep, err: ConnectError) -> ConnectError {
        let mut inner = self.inner.lock().await;
        if inner.token != token {
            debug!(target: "onboarding", "Dropping failure of a cancelled attempt: {}", err);
            return ConnectError::Cancelled;
        }

        warn!(target: "onboarding", "{} (back to '{}')", err, to);
        let session = &mut inner.session;
        session.error = Some(err.to_string());
        session.step = to;
        session.is_loading = false;
        if to == OnboardingStep::Scan {
            session.qr_data = None;
            session.device_info = None;
        }
        err
    }

    /// Record a validation failure without moving
    async fn reject(
        &self,
        action: &'static str,
        from: &[OnboardingStep],
        err: ConnectError,
    ) -> ConnectError {
        let mut inner = self.inner.lock().await;
        if let Err(state_err) = Self::ensure_idle_at(&inner.session, action, from) {
            return state_err;
        }
        inner.session.error = Some(err.to_string());
        err
    }

    async fn is_current(&self, token: u64) -> bool {
        self.inner.lock().await.token == token
    }

    /// AP-mode host and port of the session's device
    fn ap_target(&self, session: &OnboardingSession) -> Result<(String, u16), ConnectError> {
        session
            .qr_data
            .as_ref()
            .map(|qr| (self.service.ap_host(qr), qr.api_port))
            .ok_or_else(|| ConnectError::ValidationError("No device connection data".to_string()))
    }

    fn check_firmware(&self, session: &OnboardingSession) -> FirmwareUpdateInfo {
        if session.demo {
            return self.demo_device.firmware_update.clone();
        }

        let current = session
            .device_info
            .as_ref()
            .map(|d| d.firmware_version.as_str())
            .unwrap_or_default();
        FirmwareUpdateInfo::check(current, self.options.latest_firmware.as_deref())
    }

    async fn scan_into_wifi_setup(
        &self,
        attempt: Attempt,
        rollback: OnboardingStep,
    ) -> Result<OnboardingStep, ConnectError> {
        let scanned = if attempt.session.demo {
            Ok(self.demo_device.networks.clone())
        } else {
            match self.ap_target(&attempt.session) {
                Ok((host, port)) => self.service.scan_networks(&host, port).await,
                Err(e) => Err(e),
            }
        };

        match scanned {
            Ok(networks) => {
                self.commit(attempt.token, |s| {
                    s.networks = networks;
                    s.step = OnboardingStep::WifiSetup;
                })
                .await?;
                Ok(OnboardingStep::WifiSetup)
            }
            Err(e) => Err(self.fail(attempt.token, rollback, e).await),
        }
    }

    async fn provision_and_verify(
        &self,
        attempt: &Attempt,
        ssid: &str,
        password: &str,
    ) -> Result<(String, DeviceInfo), ConnectError> {
        let (host, port) = self.ap_target(&attempt.session)?;
        let result = self.service.provision(&host, port, ssid, password).await?;

        if !self.is_current(attempt.token).await {
            return Err(ConnectError::Cancelled);
        }

        let expected = attempt
            .session
            .device_info
            .as_ref()
            .map(|d| d.device_id.as_str());
        let device = self
            .service
            .verify_connection(&result.assigned_ip, port, expected)
            .await?;

        Ok((result.assigned_ip, device))
    }

    fn paired_device(&self, session: &OnboardingSession) -> Result<PairedDevice, ConnectError> {
        let (Some(device), Some(qr)) = (&session.device_info, &session.qr_data) else {
            return Err(ConnectError::ValidationError(
                "Onboarding session has no verified device".to_string(),
            ));
        };

        let name = match session.device_name.trim() {
            "" => device.model.clone(),
            name => name.to_string(),
        };

        Ok(PairedDevice {
            id: device.device_id.clone(),
            name,
            ip: session
                .assigned_ip
                .clone()
                .unwrap_or_else(|| self.service.ap_host(qr)),
            port: qr.api_port,
            model: device.model.clone(),
            firmware_version: device.firmware_version.clone(),
            serial: device.serial.clone(),
            paired_at: chrono::Utc::now(),
            connections: Vec::new(),
        })
    }
}
