use super::endpoints;
use super::gateway::Gateway;
use crate::domain::features::FeatureToggleSet;
use crate::domain::ports::{AnalyticsBox, AnalyticsEvent, StorageBox};
use crate::domain::remote_config::{CertificatePins, RemoteConfig};
use crate::domain::target::RetryPolicy;
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

pub const REMOTE_CONFIG_KEY: &str = "remote_config";
pub const CERT_HASHES_KEY: &str = "cert_hashes";

/// Fetches the server-driven configuration once per SDK lifetime.
pub struct RemoteConfigLoader {
    gateway: Arc<Gateway>,
    storage: StorageBox,
    toggles: FeatureToggleSet,
    analytics: AnalyticsBox,
    sdk_version: String,
    current: RwLock<Option<RemoteConfig>>,
    fetched: AtomicBool,
    fetch_lock: Mutex<()>,
}

impl RemoteConfigLoader {
    pub fn new(
        gateway: Arc<Gateway>,
        storage: StorageBox,
        toggles: FeatureToggleSet,
        analytics: AnalyticsBox,
        sdk_version: String,
    ) -> Self {
        Self {
            gateway,
            storage,
            toggles,
            analytics,
            sdk_version,
            current: RwLock::new(None),
            fetched: AtomicBool::new(false),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Publishes the copy persisted by an earlier launch, if it is usable.
    pub async fn prime_from_cache(&self) -> Option<RemoteConfig> {
        let raw = match self.storage.get(REMOTE_CONFIG_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read cached remote config");
                return None;
            }
        };
        let config = serde_json::from_str::<RemoteConfig>(&raw)
            .ok()
            .filter(|config| config.validate().is_ok())?;

        self.toggles.publish(&config.features_toggle).await;
        let mut current = self.current.write().await;
        if current.is_none() {
            *current = Some(config.clone());
        }
        Some(config)
    }

    /// Fetches, validates, persists and publishes the remote config.
    ///
    /// Later calls return the copy fetched by the first successful call.
    pub async fn load(&self) -> Result<RemoteConfig> {
        let _guard = self.fetch_lock.lock().await;
        if self.fetched.load(Ordering::SeqCst)
            && let Some(config) = self.current.read().await.clone()
        {
            return Ok(config);
        }

        let config: RemoteConfig = self
            .gateway
            .request_decoded(endpoints::remote_config(), &RetryPolicy::remote_config())
            .await?;
        config.validate()?;

        match serde_json::to_string(&config) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(REMOTE_CONFIG_KEY, &raw).await {
                    warn!(error = %e, "failed to persist remote config");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize remote config"),
        }
        self.toggles.publish(&config.features_toggle).await;
        if config.is_deprecated(&self.sdk_version) {
            warn!(
                sdk_version = %self.sdk_version,
                active = ?config.version_info.active,
                "this SDK version is deprecated, please update"
            );
        }
        self.analytics.send(
            AnalyticsEvent::good("RQGoodRemoteConfig").with("version", config.version.clone()),
        );
        info!(version = %config.version, "remote config loaded");

        *self.current.write().await = Some(config.clone());
        self.fetched.store(true, Ordering::SeqCst);
        Ok(config)
    }

    /// Fetched or primed config, whichever is newest.
    pub async fn current(&self) -> Option<RemoteConfig> {
        self.current.read().await.clone()
    }

    pub async fn is_deprecated(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|config| config.is_deprecated(&self.sdk_version))
    }

    /// Fetches certificate pin hashes and stores them for the transport.
    pub async fn load_certificate_pins(&self) -> Result<CertificatePins> {
        let pins: CertificatePins = self
            .gateway
            .request_decoded(endpoints::cert_config(), &RetryPolicy::remote_config())
            .await?;
        if let Err(e) = self
            .storage
            .set(CERT_HASHES_KEY, &pins.cert_hashes.join(","))
            .await
        {
            warn!(error = %e, "failed to persist certificate pins");
        }
        Ok(pins)
    }
}
