use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Bnpl,
    Refresh,
    RetryPayment,
    Sbp,
}

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Feature::Bnpl => "bnpl",
            Feature::Refresh => "refresh",
            Feature::RetryPayment => "retryPayment",
            Feature::Sbp => "sbp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggle {
    pub name: String,
    pub value: bool,
}

/// Feature flags published by remote config. Unknown names read as disabled.
#[derive(Debug, Clone, Default)]
pub struct FeatureToggleSet {
    toggles: Arc<RwLock<HashMap<String, bool>>>,
}

impl FeatureToggleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every toggle with `toggles`.
    pub async fn publish(&self, toggles: &[FeatureToggle]) {
        let mut map = self.toggles.write().await;
        map.clear();
        map.extend(toggles.iter().map(|t| (t.name.clone(), t.value)));
    }

    pub async fn is_enabled(&self, feature: Feature) -> bool {
        self.is_enabled_by_name(feature.name()).await
    }

    pub async fn is_enabled_by_name(&self, name: &str) -> bool {
        self.toggles.read().await.get(name).copied().unwrap_or(false)
    }
}
