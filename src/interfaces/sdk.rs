//! Inbound facade used by merchant hosts.

use crate::application::assembly::{PaySdkBuilder, SdkServices};
use crate::application::auth::restore_cookies;
use crate::application::bank_apps::BankAppSelector;
use crate::application::session::{CheckoutSession, SessionHandle};
use crate::config::SdkConfig;
use crate::domain::auth_info::{AuthInfo, PaymentRequest, PaymentTokenRequest};
use crate::domain::checkout::{
    CheckoutOutcome, PaymentResponse, PaymentState, PresentationEvent, Screen, SessionState,
};
use crate::domain::credentials::AuthMethod;
use crate::domain::ports::{AnalyticsEvent, PresenterBox};
use crate::error::{Result, SdkError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// A running checkout.
pub struct Checkout {
    handle: SessionHandle,
    task: JoinHandle<CheckoutOutcome>,
}

impl Checkout {
    /// Input channel of this checkout.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Waits for the checkout to reach a terminal state.
    pub async fn outcome(self) -> CheckoutOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "checkout task failed");
                CheckoutOutcome {
                    state: SessionState::Failed(SdkError::BadResponse),
                    auth_method: AuthMethod::None,
                    token: None,
                    installment_selected: false,
                }
            }
        }
    }
}

/// Entry point of the SDK. One instance serves checkouts one at a time.
pub struct PaySdk {
    services: Arc<SdkServices>,
    active: RwLock<Option<SessionHandle>>,
}

impl PaySdkBuilder {
    pub fn build(self) -> Result<PaySdk> {
        Ok(PaySdk::new(self.build_services()?))
    }
}

impl PaySdk {
    pub fn builder(config: SdkConfig) -> PaySdkBuilder {
        PaySdkBuilder::new(config)
    }

    pub fn new(services: SdkServices) -> Self {
        Self {
            services: Arc::new(services),
            active: RwLock::new(None),
        }
    }

    pub fn services(&self) -> &SdkServices {
        &self.services
    }

    /// Registers the merchant key and loads the remote configuration.
    ///
    /// A failed fetch is tolerated when an earlier launch cached a config.
    /// Certificate pins are best effort.
    pub async fn setup(&self, api_key: &str) -> Result<()> {
        let services = &self.services;
        services.credentials.set_api_key(api_key).await;
        restore_cookies(&services.storage, &services.credentials).await;

        let cached = services.remote_config.prime_from_cache().await;
        if let Err(err) = services.remote_config.load().await {
            if cached.is_none() {
                services
                    .analytics
                    .send(AnalyticsEvent::fail("Setup").with("error", err.to_string()));
                return Err(err);
            }
            warn!(error = %err, "remote config fetch failed, continuing with cached copy");
        }
        if let Err(err) = services.remote_config.load_certificate_pins().await {
            warn!(error = %err, "certificate pins unavailable");
        }
        services.analytics.send(AnalyticsEvent::good("Setup"));
        info!(profile = ?services.config.profile, "sdk ready");
        Ok(())
    }

    /// True when a configured bank app can take the auth handoff.
    pub async fn is_ready_for_pay(&self) -> bool {
        let Some(config) = self.services.remote_config.current().await else {
            return false;
        };
        let selector = BankAppSelector::new(self.services.opener.clone(), self.services.storage.clone());
        !selector.installed(&config.bank_apps).await.is_empty()
    }

    /// Starts a checkout on its own task.
    ///
    /// Only one checkout runs at a time. Starting another while one is active
    /// is [`SdkError::Waiting`].
    pub async fn get_payment_token(
        &self,
        request: PaymentTokenRequest,
        presenter: PresenterBox,
    ) -> Result<Checkout> {
        let mut active = self.active.write().await;
        if active.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("checkout requested while another one is running");
            return Err(SdkError::Waiting);
        }

        let services = &self.services;
        if let Some(api_key) = &request.api_key {
            services.credentials.override_api_key(api_key).await;
        }
        services
            .credentials
            .update(|c| c.order_number = request.order_number.clone())
            .await;

        let auth_info = AuthInfo::from_request(&request, services.config.debug);
        let (session, handle) =
            CheckoutSession::new(services.clone(), auth_info, presenter, request.bank.clone());
        let task = tokio::spawn(session.run());
        *active = Some(handle.clone());
        info!(order_id = ?request.order_id, "checkout started");
        Ok(Checkout { handle, task })
    }

    /// Pays an order with a token issued by a finished checkout.
    pub async fn pay(&self, request: &PaymentRequest) -> PaymentResponse {
        self.services.payments.pay(request).await
    }

    /// Shows the final result the merchant reports for the payment.
    pub async fn complete_payment(
        &self,
        state: PaymentState,
        presenter: &PresenterBox,
    ) -> PaymentResponse {
        let (key, fallback) = match state {
            PaymentState::Success => ("alert.pay.success", "Payment completed"),
            PaymentState::Waiting => ("alert.pay.waiting", "Waiting for the bank to confirm the payment"),
            PaymentState::Error => ("alert.pay.error", "Payment failed"),
            PaymentState::Cancel => ("alert.pay.cancel", "Payment was cancelled"),
        };
        let message = self
            .services
            .remote_config
            .current()
            .await
            .map_or_else(|| fallback.to_string(), |config| config.localized(key, fallback).to_string());
        presenter.present(PresentationEvent::ShowScreen(Screen::PaymentResult {
            state,
            message: message.clone(),
        }));
        self.services
            .analytics
            .send(AnalyticsEvent::good("CompletePayment").with("state", format!("{state:?}")));
        PaymentResponse { state, info: message }
    }

    async fn active_handle(&self) -> Option<SessionHandle> {
        self.active
            .read()
            .await
            .as_ref()
            .filter(|handle| !handle.is_finished())
            .cloned()
    }

    /// Forwards the URL a bank app opened to the running checkout.
    pub async fn handle_redirect_url(&self, url: &str) -> bool {
        match self.active_handle().await {
            Some(handle) => handle.redirect_url(url),
            None => {
                warn!("redirect URL received with no checkout running");
                false
            }
        }
    }

    pub async fn did_enter_background(&self, at: Instant) {
        if let Some(handle) = self.active_handle().await {
            handle.background(at);
        }
    }

    pub async fn will_enter_foreground(&self, at: Instant) {
        if let Some(handle) = self.active_handle().await {
            handle.foreground(at);
        }
    }

    /// Cancels the running checkout, if any.
    pub async fn dismiss(&self) -> bool {
        self.active_handle()
            .await
            .is_some_and(|handle| handle.dismiss())
    }
}
