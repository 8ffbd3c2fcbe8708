use super::endpoints;
use super::gateway::Gateway;
use crate::domain::auth_info::AuthInfo;
use crate::domain::credentials::CredentialStore;
use crate::domain::target::RetryPolicy;
use crate::domain::user::{PaymentTool, User};
use crate::error::{Result, SdkError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Loads and holds the payer's wallet for one checkout.
pub struct UserService {
    gateway: Arc<Gateway>,
    credentials: CredentialStore,
    auth_info: Arc<AuthInfo>,
    user: RwLock<Option<User>>,
    selected: RwLock<Option<i64>>,
}

impl UserService {
    pub fn new(gateway: Arc<Gateway>, credentials: CredentialStore, auth_info: Arc<AuthInfo>) -> Self {
        Self {
            gateway,
            credentials,
            auth_info,
            user: RwLock::new(None),
            selected: RwLock::new(None),
        }
    }

    /// Fetches the wallet. A wallet without tools is [`SdkError::NoCards`].
    pub async fn load(&self) -> Result<()> {
        let credentials = self.credentials.snapshot().await;
        let user: User = self
            .gateway
            .request_decoded(
                endpoints::list_cards(&self.auth_info, &credentials, false),
                &RetryPolicy::default(),
            )
            .await?;
        user.validate()?;
        if user.tools().is_empty() {
            return Err(SdkError::NoCards);
        }

        let preselected = user
            .priority_tool()
            .or_else(|| user.tools().first())
            .map(|tool| tool.payment_id);
        info!(tools = user.tools().len(), ?preselected, "payment tools loaded");
        *self.selected.write().await = preselected;
        *self.user.write().await = Some(user);
        Ok(())
    }

    pub async fn user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    /// Selects the tool with `payment_id`. Unknown ids are rejected.
    pub async fn select_tool(&self, payment_id: i64) -> Result<()> {
        let known = self
            .user
            .read()
            .await
            .as_ref()
            .is_some_and(|user| user.tool(payment_id).is_some());
        if !known {
            return Err(SdkError::NoData);
        }
        *self.selected.write().await = Some(payment_id);
        Ok(())
    }

    pub async fn selected_tool(&self) -> Option<PaymentTool> {
        let selected = (*self.selected.read().await)?;
        self.user.read().await.as_ref()?.tool(selected).cloned()
    }
}
