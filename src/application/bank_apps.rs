use crate::domain::ports::{StorageBox, UrlOpenerBox};
use crate::domain::remote_config::BankApp;
use tracing::warn;

pub const SELECTED_BANK_KEY: &str = "selected_bank";

/// Picks which installed bank app receives the auth handoff.
pub struct BankAppSelector {
    opener: UrlOpenerBox,
    storage: StorageBox,
}

impl BankAppSelector {
    pub fn new(opener: UrlOpenerBox, storage: StorageBox) -> Self {
        Self { opener, storage }
    }

    /// Apps from `apps` whose auth link the device can open, in config order.
    pub async fn installed(&self, apps: &[BankApp]) -> Vec<BankApp> {
        let mut installed = Vec::new();
        for app in apps {
            if self.opener.can_open(&app.auth_link).await {
                installed.push(app.clone());
            }
        }
        installed
    }

    /// Explicit choice first, then the remembered one, then the first installed app.
    pub async fn choose(&self, apps: &[BankApp], explicit: Option<&str>) -> Option<BankApp> {
        let installed = self.installed(apps).await;
        if let Some(name) = explicit
            && let Some(app) = installed.iter().find(|app| app.name == name)
        {
            return Some(app.clone());
        }
        if installed.len() > 1 {
            let saved = self.storage.get(SELECTED_BANK_KEY).await.ok().flatten();
            if let Some(app) = saved.and_then(|name| installed.iter().find(|app| app.name == name))
            {
                return Some(app.clone());
            }
        }
        installed.into_iter().next()
    }

    pub async fn remember(&self, app: &BankApp) {
        if let Err(e) = self.storage.set(SELECTED_BANK_KEY, &app.name).await {
            warn!(error = %e, "failed to remember selected bank app");
        }
    }

    pub async fn open(&self, link: &str) -> bool {
        self.opener.open(link).await
    }
}
