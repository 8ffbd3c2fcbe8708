//! Checkout states, presentation events, host commands and outcomes.

use super::challenge::ChallengeResolution;
use super::credentials::AuthMethod;
use super::installment::InstallmentPlan;
use super::money::Balance;
use super::user::PaymentTool;
use crate::error::SdkError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    ConfigLoading,
    Authenticating,
    ContentLoading,
    ToolSelection,
    Verifying,
    TokenIssuance,
    OtpChallenge,
    Completed,
    Cancelled,
    Failed(SdkError),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Initializing => "initializing",
            SessionState::ConfigLoading => "config_loading",
            SessionState::Authenticating => "authenticating",
            SessionState::ContentLoading => "content_loading",
            SessionState::ToolSelection => "tool_selection",
            SessionState::Verifying => "verifying",
            SessionState::TokenIssuance => "token_issuance",
            SessionState::OtpChallenge => "otp_challenge",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed(_) => "failed",
        }
    }
}

/// Result of comparing wallet balances with the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayAmountStatus {
    Sufficient,
    OnlyInstallmentSufficient,
    Insufficient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSheet {
    pub merchant_name: String,
    pub order_amount: Balance,
    pub tools: Vec<PaymentTool>,
    pub selected_payment_id: Option<i64>,
    pub status: PayAmountStatus,
    pub plan: Option<InstallmentPlan>,
    pub installment_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    /// Waiting for the named bank app to hand control back.
    BankRedirect { bank: String },
    PaymentSheet(PaymentSheet),
    Otp { phone: Option<String> },
    SecureChallenge { form: HashMap<String, String> },
    /// Final alert once the merchant reports how the payment ended.
    PaymentResult { state: PaymentState, message: String },
}

/// Everything the core asks the presenter to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    StateChanged(SessionState),
    ShowScreen(Screen),
    ShowError { error: SdkError, message: String },
}

/// Host input delivered to a running checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    SelectTool(i64),
    SelectInstallment(bool),
    Confirm,
    SubmitOtp(String),
    ResolveChallenge(ChallengeResolution),
    RedirectUrl(String),
    Background(Instant),
    Foreground(Instant),
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentToken {
    pub payment_token: String,
    #[serde(default)]
    pub payment_token_id: Option<String>,
    #[serde(default)]
    pub initiate_bank_invoice_id: Option<String>,
    #[serde(default)]
    pub token_expiration: Option<i64>,
}

/// Final report of one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub state: SessionState,
    pub auth_method: AuthMethod,
    pub token: Option<PaymentToken>,
    pub installment_selected: bool,
}

impl CheckoutOutcome {
    pub fn error(&self) -> Option<&SdkError> {
        match &self.state {
            SessionState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn token_response(&self) -> PaymentTokenResponse {
        let error = match &self.state {
            SessionState::Failed(err) => Some(err.merchant_description().to_string()),
            SessionState::Cancelled => Some(SdkError::Cancelled.merchant_description().to_string()),
            _ => None,
        };
        PaymentTokenResponse {
            payment_token: self.token.as_ref().map(|t| t.payment_token.clone()),
            payment_token_id: self.token.as_ref().and_then(|t| t.payment_token_id.clone()),
            token_expiration: self.token.as_ref().and_then(|t| t.token_expiration),
            error,
        }
    }
}

/// Merchant-facing result of `get_payment_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTokenResponse {
    pub payment_token: Option<String>,
    pub payment_token_id: Option<String>,
    pub token_expiration: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Success,
    Waiting,
    Error,
    Cancel,
}

/// Merchant-facing result of `pay` and `complete_payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResponse {
    pub state: PaymentState,
    pub info: String,
}

impl PaymentResponse {
    pub fn success() -> Self {
        Self {
            state: PaymentState::Success,
            info: "Payment completed".to_string(),
        }
    }

    /// Maps a failed payment call onto the merchant states.
    pub fn from_error(error: &SdkError) -> Self {
        let state = match error {
            SdkError::Cancelled => PaymentState::Cancel,
            SdkError::Waiting | SdkError::TimeOut => PaymentState::Waiting,
            SdkError::BadResponseWithStatus { code: 423, .. } => PaymentState::Waiting,
            _ => PaymentState::Error,
        };
        Self {
            state,
            info: error.merchant_description().to_string(),
        }
    }
}
