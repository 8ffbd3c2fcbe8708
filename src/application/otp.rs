use super::endpoints;
use super::gateway::Gateway;
use crate::domain::credentials::CredentialStore;
use crate::domain::target::RetryPolicy;
use crate::error::{Result, SdkError};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpModel {
    #[serde(default)]
    pub mobile_phone: Option<String>,
}

/// Hash sent instead of the raw one-time code.
pub fn otp_hash(code: &str, card_number: &str) -> String {
    hex::encode(Sha256::digest(format!("{code}{card_number}").as_bytes()))
}

/// One-time-code round trip for flagged payments.
pub struct OtpService {
    gateway: Arc<Gateway>,
    credentials: CredentialStore,
    merchant_login: Option<String>,
}

impl OtpService {
    pub fn new(gateway: Arc<Gateway>, credentials: CredentialStore, merchant_login: Option<String>) -> Self {
        Self {
            gateway,
            credentials,
            merchant_login,
        }
    }

    /// Asks the bank to text a code to the payer.
    pub async fn create_otp(&self, bank_invoice_id: &str, payment_id: i64) -> Result<OtpModel> {
        let session_id = self.credentials.session_id().await.ok_or(SdkError::NoData)?;
        let model: OtpModel = self
            .gateway
            .request_decoded(
                endpoints::create_otp(bank_invoice_id, &session_id, payment_id),
                &RetryPolicy::default(),
            )
            .await?;
        info!(phone = ?model.mobile_phone, "one-time code sent");
        Ok(model)
    }

    pub async fn confirm_otp(&self, bank_invoice_id: &str, code: &str, card_number: &str) -> Result<()> {
        let session_id = self.credentials.session_id().await;
        self.gateway
            .request(
                endpoints::confirm_otp(
                    bank_invoice_id,
                    &otp_hash(code, card_number),
                    self.merchant_login.as_deref(),
                    session_id.as_deref(),
                ),
                &RetryPolicy::default(),
            )
            .await
    }
}
