//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::ConnectError;
use crate::http::transport::{HttpTransport, Transport};
use crate::onboarding::OnboardingMachine;
use crate::provisioning::ProvisioningService;
use crate::registry::{DeviceRegistry, FileStore, KeyValueStore};

/// Main application state
pub struct AppState {
    /// Paired devices
    pub registry: Arc<DeviceRegistry>,

    /// Device control API calls outside of onboarding
    pub provisioning: ProvisioningService,

    /// The one onboarding session
    pub onboarding: Arc<OnboardingMachine>,
}

impl AppState {
    /// Initialize application state on disk-backed storage
    pub async fn init(options: &AppOptions) -> Result<Self, ConnectError> {
        info!("Initializing application state...");
        options.layout.setup().await?;

        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(options.layout.store_dir()));
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::with_timeout(options.request_timeout)?);

        Ok(Self::with_parts(options, store, transport))
    }

    /// Assemble state from explicit storage and transport
    pub fn with_parts(
        options: &AppOptions,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let registry = Arc::new(DeviceRegistry::new(store));
        let provisioning = ProvisioningService::with_ap_host(transport, options.ap_host.clone());
        let onboarding = Arc::new(OnboardingMachine::new(
            provisioning.clone(),
            registry.clone(),
            options.onboarding.clone(),
        ));

        Self {
            registry,
            provisioning,
            onboarding,
        }
    }
}
