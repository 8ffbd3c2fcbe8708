use super::money::Balance;
use serde::{Deserialize, Serialize};
use tracing::warn;

const SDK_SCHEME_SUFFIX: &str = "://spay";

/// Merchant request that starts a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTokenRequest {
    pub redirect_uri: String,
    pub merchant_login: Option<String>,
    pub order_id: Option<String>,
    pub amount: Option<Balance>,
    pub currency: Option<String>,
    pub order_number: Option<String>,
    pub recurrent_expiry: Option<String>,
    pub recurrent_frequency: Option<u32>,
    /// Replaces the key given at setup for this checkout only.
    pub api_key: Option<String>,
    /// Bank app to hand off to when it is installed.
    pub bank: Option<String>,
}

/// Merchant request that pays an order with an issued token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: Option<String>,
    pub payment_token: Option<String>,
    /// Identifies an issued token when the token itself is not at hand.
    pub payment_token_id: Option<String>,
    pub merchant_login: Option<String>,
    /// Authorizes this payment alone with another merchant key.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrent {
    pub enabled: bool,
    pub expiry: String,
    pub frequency: u32,
}

/// Purchase block attached to session and token requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub amount: i64,
    pub currency: String,
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrent: Option<Recurrent>,
}

/// Immutable snapshot of the merchant's checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub merchant_login: Option<String>,
    pub order_id: Option<String>,
    pub redirect_uri: String,
    pub amount: Option<Balance>,
    pub currency: Option<String>,
    pub order_number: Option<String>,
    pub recurrent_expiry: Option<String>,
    pub recurrent_frequency: Option<u32>,
}

impl AuthInfo {
    /// Builds the snapshot, normalizing the redirect URI unless `debug` is set.
    pub fn from_request(request: &PaymentTokenRequest, debug: bool) -> Self {
        let redirect_uri = if debug {
            request.redirect_uri.clone()
        } else {
            normalize_redirect_uri(&request.redirect_uri)
        };
        Self {
            merchant_login: request.merchant_login.clone(),
            order_id: request.order_id.clone(),
            redirect_uri,
            amount: request.amount,
            currency: request.currency.clone(),
            order_number: request.order_number.clone(),
            recurrent_expiry: request.recurrent_expiry.clone(),
            recurrent_frequency: request.recurrent_frequency,
        }
    }

    /// Purchase block, present only when amount, currency and order number
    /// are all usable.
    pub fn purchase(&self) -> Option<Purchase> {
        let amount = self.amount.filter(|a| !a.is_zero())?;
        let Some(amount) = amount.to_minor_units() else {
            warn!(%amount, "amount is not a whole number of minor units, purchase omitted");
            return None;
        };
        let currency = self.currency.clone()?;
        let order_number = self.order_number.clone()?;
        let recurrent = match (&self.recurrent_expiry, self.recurrent_frequency) {
            (Some(expiry), Some(frequency)) if frequency != 0 => Some(Recurrent {
                enabled: true,
                expiry: expiry.clone(),
                frequency,
            }),
            _ => None,
        };
        Some(Purchase {
            amount,
            currency,
            order_number,
            recurrent,
        })
    }
}

/// Rewrites a merchant redirect URI so it targets the SDK host.
pub fn normalize_redirect_uri(uri: &str) -> String {
    if uri.contains(SDK_SCHEME_SUFFIX) {
        return uri.to_string();
    }
    match uri.split_once("://") {
        Some((scheme, _)) => format!("{scheme}{SDK_SCHEME_SUFFIX}"),
        None => format!("{uri}{SDK_SCHEME_SUFFIX}"),
    }
}
