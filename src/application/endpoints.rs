//! Gateway endpoint catalogue.
//!
//! Each function builds the [`Target`] for one backend call. Optional fields
//! are left out of the body instead of being sent as `null`.

use crate::domain::auth_info::{AuthInfo, PaymentRequest, Purchase};
use crate::domain::challenge::ChallengeResolution;
use crate::domain::credentials::SessionCredentials;
use crate::domain::target::Target;
use serde::Serialize;

pub const SESSION_ID: &str = "sdk-gateway/v1/sessionId";
pub const AUTH: &str = "sdk-gateway/v1/auth";
pub const LIST_CARDS: &str = "sdk-gateway/v1/listCards";
pub const PAYMENT_PLAN: &str = "sdk-gateway/v2/paymentPlanBnpl";
pub const CREATE_OTP: &str = "sdk-gateway/v1/createOtpSdk";
pub const CONFIRM_OTP: &str = "sdk-gateway/v1/confirmOtp";
pub const REMOTE_CONFIG: &str = "sdk-gateway/v1/remoteConfig";
pub const CERT_CONFIG: &str = "sdk-gateway/v1/certConfig";
pub const PAYMENT_TOKEN: &str = "sdk-gateway/v1/paymentToken";
pub const PAYMENT_ORDER: &str = "sdk-gateway/v1/paymentOrder";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionIdBody<'a> {
    redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_login: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purchase: Option<Purchase>,
}

pub fn session_id(info: &AuthInfo) -> Target {
    Target::post(SESSION_ID, "session").json(&SessionIdBody {
        redirect_uri: &info.redirect_uri,
        merchant_login: info.merchant_login.as_deref(),
        order_id: info.order_id.as_deref(),
        purchase: info.purchase(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_login: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purchase: Option<Purchase>,
    device_info: &'a str,
}

pub fn auth(info: &AuthInfo, credentials: &SessionCredentials, device_info: &str) -> Target {
    Target::post(AUTH, "auth").json(&AuthBody {
        redirect_uri: &info.redirect_uri,
        auth_code: credentials.auth_code.as_deref(),
        session_id: credentials.session_id.as_deref(),
        state: credentials.state.as_deref(),
        merchant_login: info.merchant_login.as_deref(),
        order_id: info.order_id.as_deref(),
        purchase: info.purchase(),
        device_info,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListCardsBody<'a> {
    redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_login: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a str>,
    list_payment_cards: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    purchase: Option<Purchase>,
}

pub fn list_cards(info: &AuthInfo, credentials: &SessionCredentials, all_cards: bool) -> Target {
    Target::post(LIST_CARDS, "list_cards").json(&ListCardsBody {
        redirect_uri: &info.redirect_uri,
        auth_code: credentials.auth_code.as_deref(),
        session_id: credentials.session_id.as_deref(),
        state: credentials.state.as_deref(),
        merchant_login: info.merchant_login.as_deref(),
        order_id: info.order_id.as_deref(),
        list_payment_cards: all_cards,
        purchase: info.purchase(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentPlanBody<'a> {
    session_id: &'a str,
    merchant_login: &'a str,
    order_id: &'a str,
}

pub fn payment_plan(session_id: &str, merchant_login: &str, order_id: &str) -> Target {
    Target::post(PAYMENT_PLAN, "payment_plan").json(&PaymentPlanBody {
        session_id,
        merchant_login,
        order_id,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOtpBody<'a> {
    bank_invoice_id: &'a str,
    session_id: &'a str,
    payment_id: i64,
}

pub fn create_otp(bank_invoice_id: &str, session_id: &str, payment_id: i64) -> Target {
    Target::post(CREATE_OTP, "create_otp").json(&CreateOtpBody {
        bank_invoice_id,
        session_id,
        payment_id,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmOtpBody<'a> {
    bank_invoice_id: &'a str,
    otp_hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_login: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

pub fn confirm_otp(
    bank_invoice_id: &str,
    otp_hash: &str,
    merchant_login: Option<&str>,
    session_id: Option<&str>,
) -> Target {
    Target::post(CONFIRM_OTP, "confirm_otp").json(&ConfirmOtpBody {
        bank_invoice_id,
        otp_hash,
        merchant_login,
        session_id,
    })
}

pub fn remote_config() -> Target {
    Target::get(REMOTE_CONFIG, "remote_config")
}

pub fn cert_config() -> Target {
    Target::get(CERT_CONFIG, "cert_config")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FraudMonInfo {
    resolution: ChallengeResolution,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentTokenBody<'a> {
    session_id: &'a str,
    device_info: &'a str,
    payment_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    fraud_mon_info: Option<FraudMonInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_bnpl_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purchase: Option<Purchase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_login: Option<&'a str>,
}

/// Parameters of a token issuance call.
#[derive(Debug, Clone)]
pub struct TokenParams<'a> {
    pub session_id: &'a str,
    pub device_info: &'a str,
    pub payment_id: i64,
    pub installment: bool,
    pub resolution: Option<ChallengeResolution>,
}

pub fn payment_token(info: &AuthInfo, params: TokenParams<'_>) -> Target {
    Target::post(PAYMENT_TOKEN, "payment_token").json(&PaymentTokenBody {
        session_id: params.session_id,
        device_info: params.device_info,
        payment_id: params.payment_id,
        fraud_mon_info: params.resolution.map(|resolution| FraudMonInfo { resolution }),
        is_bnpl_enabled: params.installment.then_some(true),
        order_id: info.order_id.as_deref(),
        purchase: info.purchase(),
        merchant_login: info.merchant_login.as_deref(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentOrderBody<'a> {
    operation_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_token_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_login: Option<&'a str>,
}

/// Pays an order. The token id is sent only when no token is given, and the
/// request's own key authorizes this call alone.
pub fn payment_order(operation_id: &str, request: &PaymentRequest) -> Target {
    let payment_token = request.payment_token.as_deref();
    let target = Target::post(PAYMENT_ORDER, "payment_order").json(&PaymentOrderBody {
        operation_id,
        payment_token,
        payment_token_id: request
            .payment_token_id
            .as_deref()
            .filter(|_| payment_token.is_none()),
        order_id: request.order_id.as_deref(),
        merchant_login: request.merchant_login.as_deref(),
    });
    match &request.api_key {
        Some(api_key) => target.api_key(api_key.as_str()),
        None => target,
    }
}
