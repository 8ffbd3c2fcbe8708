//! Builds the SDK's dependency graph once, with explicit constructor
//! injection.

use super::gateway::Gateway;
use super::payment::PaymentService;
use super::remote_config::RemoteConfigLoader;
use super::verification::VerificationEngine;
use crate::config::SdkConfig;
use crate::domain::credentials::CredentialStore;
use crate::domain::features::FeatureToggleSet;
use crate::domain::ports::{
    AnalyticsBox, BiometricsBox, FixtureLoaderBox, StorageBox, TransportBox, UrlOpenerBox,
};
use crate::error::{Result, SdkError};
use crate::infrastructure::analytics::TracingAnalytics;
use crate::infrastructure::http::HttpTransport;
use crate::infrastructure::in_memory::{InMemoryStorage, NoBankApps, StaticBiometrics};
use crate::infrastructure::stub::{InMemoryFixtures, StubTransport};
use std::sync::Arc;
use tracing::{error, info};

/// Services shared by every checkout of one SDK instance.
pub struct SdkServices {
    pub config: SdkConfig,
    pub gateway: Arc<Gateway>,
    pub credentials: CredentialStore,
    pub toggles: FeatureToggleSet,
    pub storage: StorageBox,
    pub remote_config: RemoteConfigLoader,
    pub verification: VerificationEngine,
    pub payments: PaymentService,
    pub analytics: AnalyticsBox,
    pub opener: UrlOpenerBox,
    /// Device description sent in auth and token requests.
    pub device_info: String,
}

/// Collects host capabilities and wires the SDK.
///
/// Every capability is optional. Missing ones fall back to in-memory storage,
/// log-only analytics, no biometrics and no bank apps. The transport follows
/// the configured profile unless one is injected.
pub struct PaySdkBuilder {
    config: SdkConfig,
    transport: Option<TransportBox>,
    storage: Option<StorageBox>,
    biometrics: Option<BiometricsBox>,
    analytics: Option<AnalyticsBox>,
    opener: Option<UrlOpenerBox>,
    fixtures: Option<FixtureLoaderBox>,
}

impl PaySdkBuilder {
    pub fn new(config: SdkConfig) -> Self {
        Self {
            config,
            transport: None,
            storage: None,
            biometrics: None,
            analytics: None,
            opener: None,
            fixtures: None,
        }
    }

    pub fn transport(mut self, transport: TransportBox) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn storage(mut self, storage: StorageBox) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn biometrics(mut self, biometrics: BiometricsBox) -> Self {
        self.biometrics = Some(biometrics);
        self
    }

    pub fn analytics(mut self, analytics: AnalyticsBox) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn url_opener(mut self, opener: UrlOpenerBox) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Fixtures served by the stub profile.
    pub fn fixtures(mut self, fixtures: FixtureLoaderBox) -> Self {
        self.fixtures = Some(fixtures);
        self
    }

    fn resolve_transport(&mut self) -> Result<TransportBox> {
        if let Some(transport) = self.transport.take() {
            return Ok(transport);
        }
        match self.config.resolve_base_url() {
            None => {
                let fixtures = self
                    .fixtures
                    .take()
                    .unwrap_or_else(|| Arc::new(InMemoryFixtures::new()));
                info!("using stub transport");
                Ok(Arc::new(StubTransport::new(fixtures, self.config.stub_delay())))
            }
            Some(base_url) => {
                let transport = HttpTransport::new(&base_url, self.config.request_timeout())
                    .map_err(|e| {
                        error!(error = %e, "failed to build HTTP client");
                        SdkError::BadResponse
                    })?;
                info!(%base_url, "using live transport");
                Ok(Arc::new(transport))
            }
        }
    }

    /// Wires the shared services.
    pub fn build_services(mut self) -> Result<SdkServices> {
        let transport = self.resolve_transport()?;
        let config = self.config;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(InMemoryStorage::new()));
        let analytics = self.analytics.unwrap_or_else(|| Arc::new(TracingAnalytics));
        let biometrics = self
            .biometrics
            .unwrap_or_else(|| Arc::new(StaticBiometrics::new(false, false)));
        let opener = self.opener.unwrap_or_else(|| Arc::new(NoBankApps));
        let device_info = serde_json::to_string(&config.device)
            .map_err(|e| SdkError::FailDecode(e.to_string()))?;

        let credentials = CredentialStore::new();
        let toggles = FeatureToggleSet::new();
        let gateway = Arc::new(Gateway::new(transport, credentials.clone(), &config));
        let remote_config = RemoteConfigLoader::new(
            gateway.clone(),
            storage.clone(),
            toggles.clone(),
            analytics.clone(),
            config.sdk_version.clone(),
        );
        let verification = VerificationEngine::new(biometrics, analytics.clone());
        let payments = PaymentService::new(
            gateway.clone(),
            credentials.clone(),
            toggles.clone(),
            device_info.clone(),
        );

        Ok(SdkServices {
            config,
            gateway,
            credentials,
            toggles,
            storage,
            remote_config,
            verification,
            payments,
            analytics,
            opener,
            device_info,
        })
    }
}
