use super::bank_apps::BankAppSelector;
use super::endpoints;
use super::gateway::Gateway;
use super::verification::Reauthenticate;
use crate::config::NetworkProfile;
use crate::domain::auth_info::AuthInfo;
use crate::domain::checkout::{PresentationEvent, Screen};
use crate::domain::cookies::CookieKind;
use crate::domain::credentials::{AuthMethod, CredentialStore};
use crate::domain::features::{Feature, FeatureToggleSet};
use crate::domain::ports::{PresenterBox, StorageBox};
use crate::domain::remote_config::BankApp;
use crate::domain::target::RetryPolicy;
use crate::error::{Result, SdkError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};
use url::Url;

/// Auth code accepted by the sandbox backend in place of a bank-app round trip.
pub const SANDBOX_AUTH_CODE: &str = "3401216B-8B70-21FA-2592-58010E53EE5B";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionModel {
    pub session_id: String,
    #[serde(default)]
    pub deeplink: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub is_bnpl_enabled: Option<bool>,
    #[serde(default)]
    pub refresh_token_is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    #[serde(default)]
    is_otp_need: Option<bool>,
    #[serde(default)]
    merchant_name: Option<String>,
}

/// Code and state returned by the bank app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankRedirect {
    pub code: String,
    pub state: Option<String>,
}

/// Parses the URL the bank app opens when it hands control back.
pub fn parse_redirect_url(raw: &str) -> Result<BankRedirect> {
    let url = Url::parse(raw).map_err(|_| SdkError::BadResponse)?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(if error == "unauthorized_client" {
            SdkError::UnauthorizedClient
        } else {
            SdkError::BadResponse
        });
    }
    if params.get("status").is_some_and(|status| status != "success") {
        return Err(SdkError::BadResponse);
    }
    let code = params
        .get("code")
        .filter(|code| !code.is_empty())
        .ok_or(SdkError::BadResponse)?;
    Ok(BankRedirect {
        code: code.clone(),
        state: params.get("state").cloned(),
    })
}

/// Loads remember-me cookies saved by an earlier checkout.
pub async fn restore_cookies(storage: &StorageBox, credentials: &CredentialStore) {
    for kind in CookieKind::ALL {
        let Some(key) = kind.storage_key() else {
            continue;
        };
        match storage.get(key).await {
            Ok(Some(value)) => credentials.set_cookie(kind, Some(value)).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, key, "failed to restore cookie"),
        }
    }
}

/// Saves the remember-me cookies the gateway has collected.
pub async fn persist_cookies(storage: &StorageBox, credentials: &CredentialStore) {
    for kind in CookieKind::ALL {
        let Some(key) = kind.storage_key() else {
            continue;
        };
        if let Some(value) = credentials.cookie(kind).await
            && let Err(e) = storage.set(key, &value).await
        {
            warn!(error = %e, key, "failed to persist cookie");
        }
    }
}

/// Everything the auth service needs besides per-checkout data.
pub struct AuthContext {
    pub gateway: Arc<Gateway>,
    pub credentials: CredentialStore,
    pub toggles: FeatureToggleSet,
    pub storage: StorageBox,
    pub selector: BankAppSelector,
    pub presenter: PresenterBox,
    pub profile: NetworkProfile,
    pub refresh_enabled: bool,
    pub device_info: String,
}

/// Session creation and authentication for one checkout.
pub struct AuthService {
    ctx: AuthContext,
    auth_info: Arc<AuthInfo>,
    bank_apps: Vec<BankApp>,
    preferred_bank: Option<String>,
    session: Mutex<Option<SessionModel>>,
    pending_redirect: Mutex<Option<oneshot::Sender<Result<BankRedirect>>>>,
}

impl AuthService {
    pub fn new(
        ctx: AuthContext,
        auth_info: Arc<AuthInfo>,
        bank_apps: Vec<BankApp>,
        preferred_bank: Option<String>,
    ) -> Self {
        Self {
            ctx,
            auth_info,
            bank_apps,
            preferred_bank,
            session: Mutex::new(None),
            pending_redirect: Mutex::new(None),
        }
    }

    /// Creates the backend session and decides how to authenticate it.
    pub async fn obtain_session(&self) -> Result<AuthMethod> {
        let session: SessionModel = self
            .ctx
            .gateway
            .request_decoded(endpoints::session_id(&self.auth_info), &RetryPolicy::default())
            .await?;

        let refresh_active = session.refresh_token_is_active.unwrap_or(false);
        self.ctx
            .credentials
            .update(|c| {
                c.session_id = Some(session.session_id.clone());
                c.state = session.state.clone();
                c.session_bnpl_enabled = session.is_bnpl_enabled.unwrap_or(false);
                c.refresh_token_active = refresh_active;
            })
            .await;

        let method = self.choose_method(refresh_active).await;
        self.ctx.credentials.set_auth_method(method).await;
        info!(session_id = %session.session_id, ?method, "session obtained");
        *self.session.lock().await = Some(session);
        Ok(method)
    }

    async fn choose_method(&self, refresh_active: bool) -> AuthMethod {
        let credentials = self.ctx.credentials.snapshot().await;
        if refresh_active
            && self.ctx.refresh_enabled
            && self.ctx.toggles.is_enabled(Feature::Refresh).await
            && credentials.cookies.has_refresh_credentials()
        {
            AuthMethod::RefreshToken
        } else if self.ctx.profile == NetworkProfile::Sandbox {
            AuthMethod::SessionIdOnly
        } else {
            AuthMethod::BankApp
        }
    }

    /// Runs the full authentication for `method`.
    pub async fn authenticate(&self, method: AuthMethod) -> Result<()> {
        match method {
            AuthMethod::BankApp => {
                self.app_auth().await?;
                self.auth().await
            }
            AuthMethod::SessionIdOnly => {
                self.ctx
                    .credentials
                    .set_auth_code(SANDBOX_AUTH_CODE.to_string(), None)
                    .await;
                self.auth().await
            }
            AuthMethod::RefreshToken => self.auth().await,
            AuthMethod::None => Err(SdkError::NoData),
        }
    }

    /// Hands off to the bank app and waits for its redirect.
    pub async fn app_auth(&self) -> Result<()> {
        let bank = self
            .ctx
            .selector
            .choose(&self.bank_apps, self.preferred_bank.as_deref())
            .await
            .ok_or(SdkError::NoData)?;
        let deeplink = self
            .session
            .lock()
            .await
            .as_ref()
            .and_then(|session| session.deeplink.clone())
            .ok_or(SdkError::NoData)?;
        let link = format!("{}{}", bank.auth_link, deeplink);

        let (tx, rx) = oneshot::channel();
        *self.pending_redirect.lock().await = Some(tx);

        self.ctx.presenter.present(PresentationEvent::ShowScreen(Screen::BankRedirect {
            bank: bank.name.clone(),
        }));
        if !self.ctx.selector.open(&link).await {
            self.pending_redirect.lock().await.take();
            warn!(bank = %bank.name, "bank app could not be opened");
            return Err(SdkError::NoData);
        }
        info!(bank = %bank.name, "waiting for bank app redirect");

        let redirect = rx.await.map_err(|_| SdkError::Cancelled)??;
        self.ctx
            .credentials
            .set_auth_code(redirect.code, redirect.state)
            .await;
        self.ctx.selector.remember(&bank).await;
        Ok(())
    }

    /// Delivers a redirect URL to a waiting bank-app handoff.
    ///
    /// Returns `false` when no handoff was waiting.
    pub async fn complete_redirect(&self, url: &str) -> bool {
        let Some(tx) = self.pending_redirect.lock().await.take() else {
            debug!("redirect URL arrived with no pending handoff");
            return false;
        };
        tx.send(parse_redirect_url(url)).is_ok()
    }

    /// Authenticates the session with the collected credentials.
    pub async fn auth(&self) -> Result<()> {
        let credentials = self.ctx.credentials.snapshot().await;
        let response: AuthResponse = self
            .ctx
            .gateway
            .request_decoded(
                endpoints::auth(&self.auth_info, &credentials, &self.ctx.device_info),
                &RetryPolicy::default(),
            )
            .await?;
        self.ctx
            .credentials
            .update(|c| c.otp_required = response.is_otp_need)
            .await;
        persist_cookies(&self.ctx.storage, &self.ctx.credentials).await;
        info!(merchant = ?response.merchant_name, "session authenticated");
        Ok(())
    }
}

#[async_trait]
impl Reauthenticate for AuthService {
    async fn reauthenticate(&self) -> Result<()> {
        self.app_auth().await?;
        self.auth().await?;
        self.ctx.credentials.set_auth_method(AuthMethod::BankApp).await;
        Ok(())
    }
}
