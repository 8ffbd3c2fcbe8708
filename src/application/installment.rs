use super::endpoints;
use super::gateway::Gateway;
use crate::domain::auth_info::AuthInfo;
use crate::domain::credentials::CredentialStore;
use crate::domain::features::{Feature, FeatureToggleSet};
use crate::domain::installment::InstallmentPlan;
use crate::domain::target::RetryPolicy;
use crate::error::{Result, SdkError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Loads the installment offer and tracks whether the payer chose it.
pub struct InstallmentService {
    gateway: Arc<Gateway>,
    credentials: CredentialStore,
    toggles: FeatureToggleSet,
    merchant_enabled: bool,
    auth_info: Arc<AuthInfo>,
    plan: RwLock<Option<InstallmentPlan>>,
    selected: AtomicBool,
}

impl InstallmentService {
    pub fn new(
        gateway: Arc<Gateway>,
        credentials: CredentialStore,
        toggles: FeatureToggleSet,
        merchant_enabled: bool,
        auth_info: Arc<AuthInfo>,
    ) -> Self {
        Self {
            gateway,
            credentials,
            toggles,
            merchant_enabled,
            auth_info,
            plan: RwLock::new(None),
            selected: AtomicBool::new(false),
        }
    }

    /// Installments need the remote toggle, the merchant switch and a session
    /// that allows them.
    pub async fn is_offered(&self) -> bool {
        self.merchant_enabled
            && self.toggles.is_enabled(Feature::Bnpl).await
            && self.credentials.snapshot().await.session_bnpl_enabled
    }

    /// Fetches the plan, or does nothing when installments are not offered.
    pub async fn load(&self) -> Result<()> {
        if !self.is_offered().await {
            debug!("installments not offered for this checkout");
            return Ok(());
        }
        let session_id = self.credentials.session_id().await.ok_or(SdkError::NoData)?;
        let merchant_login = self.auth_info.merchant_login.as_deref().ok_or(SdkError::NoData)?;
        let order_id = self.auth_info.order_id.as_deref().ok_or(SdkError::NoData)?;

        let plan: InstallmentPlan = self
            .gateway
            .request_decoded(
                endpoints::payment_plan(&session_id, merchant_login, order_id),
                &RetryPolicy::default(),
            )
            .await?;
        info!(
            enabled = plan.is_bnpl_enabled,
            payments = plan.payments().len(),
            "installment plan loaded"
        );
        if plan.first_payment().is_some() {
            *self.plan.write().await = Some(plan);
        }
        Ok(())
    }

    pub async fn plan(&self) -> Option<InstallmentPlan> {
        self.plan.read().await.clone()
    }

    /// Chooses between the plan and full payment. Choosing the plan without
    /// one loaded is ignored.
    pub async fn set_selected(&self, selected: bool) -> bool {
        let selected = selected && self.plan.read().await.is_some();
        self.selected.store(selected, Ordering::SeqCst);
        selected
    }

    pub fn is_selected(&self) -> bool {
        self.selected.load(Ordering::SeqCst)
    }
}
