use thiserror::Error;

/// Failures surfaced by the payment core.
///
/// Network failures are classified once by the gateway. Everything above it
/// propagates the same taxonomy with `?`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("no internet connection")]
    NoInternetConnection,
    #[error("no data received")]
    NoData,
    #[error("bad response with status {code}")]
    BadResponseWithStatus { code: u16, payload: Option<String> },
    #[error("failed to decode response: {0}")]
    FailDecode(String),
    #[error("unauthorized client")]
    UnauthorizedClient,
    #[error("personal info required")]
    PersonalInfoRequired,
    #[error("no payment tools available")]
    NoCards,
    #[error("bad response")]
    BadResponse,
    #[error("cancelled by user")]
    Cancelled,
    #[error("payment is waiting for confirmation")]
    Waiting,
    #[error("request timed out")]
    TimeOut,
    #[error("server error: {text}")]
    ErrorFromServer {
        text: String,
        payload: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, SdkError>;

impl SdkError {
    /// Raw response body attached to the failure, if the server sent one.
    pub fn payload(&self) -> Option<&str> {
        match self {
            SdkError::BadResponseWithStatus { payload, .. }
            | SdkError::ErrorFromServer { payload, .. } => payload.as_deref(),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::BadResponseWithStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Localization key reported to the merchant alongside the failure.
    pub fn description_key(&self) -> &'static str {
        match self {
            SdkError::NoInternetConnection
            | SdkError::UnauthorizedClient
            | SdkError::PersonalInfoRequired
            | SdkError::NoCards
            | SdkError::BadResponse
            | SdkError::Waiting => "error.system",
            SdkError::NoData | SdkError::FailDecode(_) | SdkError::ErrorFromServer { .. } => {
                "error.format"
            }
            SdkError::BadResponseWithStatus { code, .. } if (400..500).contains(code) => {
                "error.format"
            }
            SdkError::BadResponseWithStatus { .. } => "error.system",
            SdkError::Cancelled => "error.close",
            SdkError::TimeOut => "error.timeout",
        }
    }

    /// Default merchant-facing text for [`SdkError::description_key`].
    pub fn merchant_description(&self) -> &'static str {
        match self.description_key() {
            "error.format" => "Invalid request or response format",
            "error.close" => "Payment was cancelled by the user",
            "error.timeout" => "Response timeout expired",
            _ => "System error",
        }
    }
}
