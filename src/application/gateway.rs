use crate::config::{DeviceInfo, SdkConfig};
use crate::domain::credentials::CredentialStore;
use crate::domain::ports::{OutboundRequest, RawResponse, TransportBox, TransportError};
use crate::domain::target::{RetryPolicy, Target};
use crate::error::{Result, SdkError};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

const POD_HEADER: &str = "x-pod-sticky";
const SET_COOKIE_HEADER: &str = "set-cookie";

/// Single entry point for every backend call.
///
/// Injects the common headers, applies the retry policy, classifies failures
/// into [`SdkError`] and feeds affinity cookies back into the credential
/// store. All in-flight requests can be cancelled at once with
/// [`Gateway::cancel_task`].
pub struct Gateway {
    transport: TransportBox,
    credentials: CredentialStore,
    language: String,
    device: DeviceInfo,
    sdk_version: String,
    cancel_epoch: watch::Sender<u64>,
    cancellations: AtomicUsize,
}

impl Gateway {
    /// Creates a gateway over `transport`.
    ///
    /// # Arguments
    ///
    /// * `transport` - Live or stub transport.
    /// * `credentials` - Source of auth headers and sink for response cookies.
    /// * `config` - Provides language, device and SDK version headers.
    pub fn new(transport: TransportBox, credentials: CredentialStore, config: &SdkConfig) -> Self {
        let (cancel_epoch, _) = watch::channel(0);
        Self {
            transport,
            credentials,
            language: config.language.clone(),
            device: config.device.clone(),
            sdk_version: config.sdk_version.clone(),
            cancel_epoch,
            cancellations: AtomicUsize::new(0),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Runs a call whose response body is not needed.
    pub async fn request(&self, target: Target, policy: &RetryPolicy) -> Result<()> {
        self.execute(&target, policy).await.map(|_| ())
    }

    /// Runs a call and decodes its JSON body into `T`.
    pub async fn request_decoded<T: DeserializeOwned>(
        &self,
        target: Target,
        policy: &RetryPolicy,
    ) -> Result<T> {
        let response = self.execute(&target, policy).await?;
        decode(&response.body)
    }

    /// Aborts every request currently in flight. Later requests run normally.
    pub fn cancel_task(&self) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
        self.cancel_epoch.send_modify(|epoch| *epoch += 1);
        debug!("cancelled in-flight gateway requests");
    }

    /// Number of times [`Gateway::cancel_task`] has been called.
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    async fn execute(&self, target: &Target, policy: &RetryPolicy) -> Result<RawResponse> {
        let mut cancelled = self.cancel_epoch.subscribe();
        tokio::select! {
            biased;
            _ = cancelled.changed() => Err(SdkError::Cancelled),
            result = self.execute_with_retries(target, policy) => result,
        }
    }

    async fn execute_with_retries(&self, target: &Target, policy: &RetryPolicy) -> Result<RawResponse> {
        let mut attempt = 1;
        loop {
            match self.attempt(target).await {
                Ok(response) => return Ok(response),
                Err(err) if policy.should_retry(attempt, &err) => {
                    warn!(
                        path = target.path,
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "retrying request"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(&self, target: &Target) -> Result<RawResponse> {
        let body = match &target.body {
            Some(body) => Some(
                serde_json::to_vec(body).map_err(|e| SdkError::FailDecode(e.to_string()))?,
            ),
            None => None,
        };
        let request = OutboundRequest {
            method: target.method,
            path: target.path.to_string(),
            query: target.query.clone(),
            headers: self.headers(target).await,
            body,
            fixture: target.fixture,
        };

        debug!(path = target.path, method = ?target.method, "sending request");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(classify_transport_error)?;
        self.capture_affinity(&response).await;

        if !(200..300).contains(&response.status) {
            return Err(SdkError::BadResponseWithStatus {
                code: response.status,
                payload: body_text(&response.body),
            });
        }
        check_error_code(&response.body)?;
        Ok(response)
    }

    async fn headers(&self, target: &Target) -> Vec<(String, String)> {
        let credentials = self.credentials.snapshot().await;
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("RqUID".to_string(), Uuid::new_v4().simple().to_string()),
            ("UserTm".to_string(), chrono::Local::now().to_rfc2822()),
            (
                "x-client-os".to_string(),
                format!("{}; sdk {}", self.device.os, self.sdk_version),
            ),
            ("x-device-model".to_string(), self.device.model.clone()),
            (
                "Accept-Language".to_string(),
                credentials.language.unwrap_or_else(|| self.language.clone()),
            ),
        ];
        if let Some(api_key) = target.api_key.clone().or(credentials.api_key) {
            headers.push(("Authorization".to_string(), format!("Bearer {api_key}")));
        }
        if let Some(pod) = credentials.pod {
            headers.push((POD_HEADER.to_string(), pod));
        }
        if let Some(order_number) = credentials.order_number {
            headers.push(("x-order-number".to_string(), order_number));
        }
        if let Some(cookie) = credentials.cookies.header() {
            headers.push(("Cookie".to_string(), cookie));
        }
        headers
    }

    async fn capture_affinity(&self, response: &RawResponse) {
        let set_cookie: Vec<&str> = response.header_values(SET_COOKIE_HEADER).collect();
        if !set_cookie.is_empty() {
            self.credentials.absorb_set_cookie(&set_cookie.join(", ")).await;
        }
        if let Some(pod) = response.header_values(POD_HEADER).next() {
            self.credentials.set_pod(pod.to_string()).await;
        }
    }
}

fn classify_transport_error(error: TransportError) -> SdkError {
    debug!(%error, "transport failure");
    match error {
        TransportError::TimedOut => SdkError::TimeOut,
        TransportError::Tls(_) => SdkError::BadResponse,
        TransportError::Offline | TransportError::Other(_) => SdkError::NoInternetConnection,
    }
}

fn body_text(body: &[u8]) -> Option<String> {
    (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned())
}

/// Rejects 2xx bodies that carry a non-zero `errorCode`.
fn check_error_code(body: &[u8]) -> Result<()> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body) else {
        return Ok(());
    };
    let code = match map.get("errorCode") {
        Some(serde_json::Value::String(code)) => code.clone(),
        Some(serde_json::Value::Number(code)) => code.to_string(),
        _ => return Ok(()),
    };
    if code == "0" {
        return Ok(());
    }
    let text = map
        .get("description")
        .or_else(|| map.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("error code {code}"));
    Err(SdkError::ErrorFromServer {
        text,
        payload: body_text(body),
    })
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(SdkError::NoData);
    }
    serde_json::from_slice(body).map_err(|e| SdkError::FailDecode(e.to_string()))
}
