use super::endpoints::{self, TokenParams};
use super::gateway::Gateway;
use crate::domain::auth_info::{AuthInfo, PaymentRequest};
use crate::domain::challenge::{ChallengeResolution, FraudCheckResult};
use crate::domain::checkout::{PaymentResponse, PaymentToken};
use crate::domain::credentials::CredentialStore;
use crate::domain::features::{Feature, FeatureToggleSet};
use crate::domain::target::RetryPolicy;
use crate::error::{Result, SdkError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentTokenModel {
    #[serde(default)]
    payment_token: Option<String>,
    #[serde(default)]
    payment_token_id: Option<String>,
    #[serde(default)]
    initiate_bank_invoice_id: Option<String>,
    #[serde(default)]
    token_expiration: Option<i64>,
    #[serde(default)]
    fraud_mon_check_result: Option<FraudCheckResult>,
}

/// Result of one token issuance call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenIssuance {
    Issued(PaymentToken),
    /// Fraud monitoring wants the payer to prove the payment is genuine.
    Challenge(FraudCheckResult),
}

/// Token issuance and order payment.
pub struct PaymentService {
    gateway: Arc<Gateway>,
    credentials: CredentialStore,
    toggles: FeatureToggleSet,
    device_info: String,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<Gateway>,
        credentials: CredentialStore,
        toggles: FeatureToggleSet,
        device_info: String,
    ) -> Self {
        Self {
            gateway,
            credentials,
            toggles,
            device_info,
        }
    }

    /// Requests a payment token for `payment_id`.
    ///
    /// # Arguments
    ///
    /// * `info` - Checkout request snapshot.
    /// * `payment_id` - Tool chosen by the payer.
    /// * `installment` - Whether the installment plan was chosen.
    /// * `resolution` - Answer to a previous fraud challenge, if any.
    pub async fn issue_token(
        &self,
        info: &AuthInfo,
        payment_id: i64,
        installment: bool,
        resolution: Option<ChallengeResolution>,
    ) -> Result<TokenIssuance> {
        let session_id = self.credentials.session_id().await.ok_or(SdkError::NoData)?;
        let target = endpoints::payment_token(
            info,
            TokenParams {
                session_id: &session_id,
                device_info: &self.device_info,
                payment_id,
                installment,
                resolution,
            },
        );

        match self
            .gateway
            .request_decoded::<PaymentTokenModel>(target, &RetryPolicy::default())
            .await
        {
            Ok(PaymentTokenModel {
                payment_token: Some(payment_token),
                payment_token_id,
                initiate_bank_invoice_id,
                token_expiration,
                ..
            }) => {
                info!(payment_id, installment, "payment token issued");
                Ok(TokenIssuance::Issued(PaymentToken {
                    payment_token,
                    payment_token_id,
                    initiate_bank_invoice_id,
                    token_expiration,
                }))
            }
            Ok(PaymentTokenModel {
                fraud_mon_check_result: Some(check),
                ..
            }) => Ok(TokenIssuance::Challenge(check)),
            Ok(_) => Err(SdkError::NoData),
            Err(err) => match err.payload().and_then(FraudCheckResult::from_payload) {
                Some(check) => {
                    info!(action = ?check.action_code, "payment flagged by fraud monitoring");
                    Ok(TokenIssuance::Challenge(check))
                }
                None => Err(err),
            },
        }
    }

    /// Pays an order with a token issued earlier.
    ///
    /// Retries on 500/423 when the `retryPayment` feature is on.
    pub async fn pay(&self, request: &PaymentRequest) -> PaymentResponse {
        let policy = RetryPolicy::payment_order(self.toggles.is_enabled(Feature::RetryPayment).await);
        let operation_id = Uuid::new_v4().to_string();
        info!(
            %operation_id,
            order_id = ?request.order_id,
            payment_token_id = ?request.payment_token_id,
            has_token = request.payment_token.is_some(),
            "paying order"
        );
        let result = self
            .gateway
            .request(endpoints::payment_order(&operation_id, request), &policy)
            .await;

        match result {
            Ok(()) => {
                info!(%operation_id, "order paid");
                PaymentResponse::success()
            }
            Err(err) => {
                warn!(%operation_id, error = %err, "order payment failed");
                PaymentResponse::from_error(&err)
            }
        }
    }
}
