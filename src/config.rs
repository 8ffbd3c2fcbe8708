//! SDK configuration and environment resolution.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Backend environment the SDK talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    #[default]
    Production,
    Psi,
    Ift,
    /// Test backend without a real bank app on the device.
    Sandbox,
    /// Offline mode backed by a fixture loader.
    Stub,
}

impl NetworkProfile {
    pub fn host(self) -> Option<&'static str> {
        match self {
            NetworkProfile::Production => Some("https://gate1.spaymentsplus.ru"),
            NetworkProfile::Psi => Some("https://psi.gate1.spaymentsplus.ru"),
            NetworkProfile::Ift => Some("https://ift.gate1.spaymentsplus.ru"),
            NetworkProfile::Sandbox => Some("https://ift.gate2.spaymentsplus.ru"),
            NetworkProfile::Stub => None,
        }
    }
}

/// Device description sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub os: String,
    pub model: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            model: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub profile: NetworkProfile,
    /// Overrides the profile host when set.
    pub base_url: Option<String>,
    pub session_timeout_secs: u64,
    pub stub_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub language: String,
    /// Merchant switch for installment plans.
    pub bnpl_enabled: bool,
    /// Merchant switch for the remember-me flow.
    pub refresh_enabled: bool,
    /// Skips redirect URI normalization.
    pub debug: bool,
    pub sdk_version: String,
    pub device: DeviceInfo,
    pub max_challenge_retries: u32,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            profile: NetworkProfile::default(),
            base_url: None,
            session_timeout_secs: 120,
            stub_delay_ms: 500,
            request_timeout_secs: 30,
            language: "ru".to_string(),
            bnpl_enabled: false,
            refresh_enabled: true,
            debug: false,
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            device: DeviceInfo::default(),
            max_challenge_retries: 1,
        }
    }
}

impl SdkConfig {
    /// Reads a JSON config file. Missing fields fall back to defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Host for the active profile, or `None` in stub mode.
    pub fn resolve_base_url(&self) -> Option<String> {
        if self.profile == NetworkProfile::Stub {
            return None;
        }
        self.base_url
            .clone()
            .or_else(|| self.profile.host().map(str::to_string))
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn stub_delay(&self) -> Duration {
        Duration::from_millis(self.stub_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
