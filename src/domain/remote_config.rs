use super::features::FeatureToggle;
use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankApp {
    pub name: String,
    pub auth_link: String,
    #[serde(default)]
    pub util_link: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Images {
    #[serde(default)]
    pub logo_icon: Option<String>,
    #[serde(default)]
    pub logo_clear: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub deprecated: Vec<String>,
}

/// Server-driven configuration fetched at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub version: String,
    #[serde(default)]
    pub localization: HashMap<String, String>,
    pub bank_apps: Vec<BankApp>,
    #[serde(default)]
    pub features_toggle: Vec<FeatureToggle>,
    #[serde(default)]
    pub images: Images,
    #[serde(default)]
    pub cert_hashes: Vec<String>,
    #[serde(default)]
    pub version_info: VersionInfo,
}

impl RemoteConfig {
    /// Fails fast on documents that parse but are unusable.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(SdkError::FailDecode("remote config has no version".into()));
        }
        if self.bank_apps.is_empty() {
            return Err(SdkError::FailDecode("remote config lists no bank apps".into()));
        }
        if let Some(app) = self
            .bank_apps
            .iter()
            .find(|app| app.name.trim().is_empty() || app.auth_link.trim().is_empty())
        {
            return Err(SdkError::FailDecode(format!(
                "bank app '{}' has no name or auth link",
                app.name
            )));
        }
        Ok(())
    }

    /// True when `sdk_version` matches any entry of the deprecated list.
    pub fn is_deprecated(&self, sdk_version: &str) -> bool {
        self.version_info
            .deprecated
            .iter()
            .any(|v| !v.is_empty() && sdk_version.contains(v.as_str()))
    }

    pub fn localized<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.localization.get(key).map(String::as_str).unwrap_or(fallback)
    }
}

/// Certificate pin hashes, stored for the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePins {
    pub cert_hashes: Vec<String>,
}
