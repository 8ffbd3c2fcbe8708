use super::cookies::{CookieJar, CookieKind};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How the current session was (or will be) authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Round trip through the bank app.
    BankApp,
    /// Session id alone, used by the sandbox backend.
    SessionIdOnly,
    /// Stored remember-me cookies plus local biometrics.
    RefreshToken,
    #[default]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub api_key: Option<String>,
    pub initial_api_key: Option<String>,
    pub session_id: Option<String>,
    pub auth_code: Option<String>,
    pub state: Option<String>,
    pub language: Option<String>,
    pub order_number: Option<String>,
    pub auth_method: AuthMethod,
    pub otp_required: Option<bool>,
    pub session_bnpl_enabled: bool,
    pub refresh_token_active: bool,
    pub pod: Option<String>,
    pub cookies: CookieJar,
}

/// Shared credential record for the SDK lifetime.
///
/// Cloning shares the same underlying record. Readers take a consistent
/// [`SessionCredentials`] snapshot.
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    inner: Arc<RwLock<SessionCredentials>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> SessionCredentials {
        self.inner.read().await.clone()
    }

    /// Applies `f` under the write lock.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionCredentials),
    {
        let mut credentials = self.inner.write().await;
        f(&mut credentials);
    }

    /// Registers the setup key. Every later checkout falls back to it.
    pub async fn set_api_key(&self, api_key: &str) {
        self.update(|c| {
            c.initial_api_key = Some(api_key.to_string());
            c.api_key = Some(api_key.to_string());
        })
        .await;
    }

    /// Replaces the key for the current checkout only. [`Self::clear_session`]
    /// restores the setup key.
    pub async fn override_api_key(&self, api_key: &str) {
        self.update(|c| c.api_key = Some(api_key.to_string())).await;
    }

    pub async fn set_session(&self, session_id: String, state: Option<String>) {
        self.update(|c| {
            c.session_id = Some(session_id);
            c.state = state;
        })
        .await;
    }

    pub async fn set_auth_code(&self, auth_code: String, state: Option<String>) {
        self.update(|c| {
            c.auth_code = Some(auth_code);
            if state.is_some() {
                c.state = state;
            }
        })
        .await;
    }

    pub async fn set_auth_method(&self, method: AuthMethod) {
        self.update(|c| c.auth_method = method).await;
    }

    pub async fn auth_method(&self) -> AuthMethod {
        self.inner.read().await.auth_method
    }

    pub async fn session_id(&self) -> Option<String> {
        self.inner.read().await.session_id.clone()
    }

    /// Feeds a response's `Set-Cookie` header into the jar.
    pub async fn absorb_set_cookie(&self, header: &str) {
        self.update(|c| c.cookies.absorb(header)).await;
    }

    pub async fn set_pod(&self, pod: String) {
        self.update(|c| c.pod = Some(pod)).await;
    }

    pub async fn cookie(&self, kind: CookieKind) -> Option<String> {
        self.inner.read().await.cookies.get(kind).map(str::to_string)
    }

    pub async fn set_cookie(&self, kind: CookieKind, value: Option<String>) {
        self.update(|c| c.cookies.set(kind, value)).await;
    }

    /// Wipes everything tied to the finished checkout. Remember-me cookies,
    /// the API keys and the language survive.
    pub async fn clear_session(&self) {
        self.update(|c| {
            c.session_id = None;
            c.auth_code = None;
            c.state = None;
            c.order_number = None;
            c.auth_method = AuthMethod::None;
            c.otp_required = None;
            c.session_bnpl_enabled = false;
            c.refresh_token_active = false;
            c.pod = None;
            c.cookies.geo = None;
            if let Some(initial) = c.initial_api_key.clone() {
                c.api_key = Some(initial);
            }
        })
        .await;
    }
}
