#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal_macros::dec;
use spay_core::application::endpoints;
use spay_core::config::{NetworkProfile, SdkConfig};
use spay_core::domain::auth_info::PaymentTokenRequest;
use spay_core::domain::checkout::{CheckoutOutcome, PresentationEvent};
use spay_core::domain::money::Balance;
use spay_core::domain::ports::{RawResponse, UrlOpener};
use spay_core::infrastructure::in_memory::{
    InMemoryStorage, RecordingAnalytics, ScriptedTransport, StaticBiometrics,
};
use spay_core::interfaces::console::Autopilot;
use spay_core::interfaces::presenter::ChannelPresenter;
use spay_core::interfaces::sdk::{Checkout, PaySdk};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

pub const REDIRECT_URI: &str = "shop://spay";

/// Reads `tests/fixtures/{name}.json`.
pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}.json"))
        .unwrap_or_else(|e| panic!("fixture {name}: {e}"))
}

pub fn ok(body: impl Into<Vec<u8>>) -> RawResponse {
    RawResponse::ok(body)
}

pub fn status(code: u16, body: &str) -> RawResponse {
    RawResponse {
        status: code,
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
    }
}

/// Bank app that either approves every handoff or never comes back.
pub struct FakeBankApp {
    redirects: Option<mpsc::UnboundedSender<String>>,
    pub opened: AtomicUsize,
}

impl FakeBankApp {
    pub fn approving() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Self {
            redirects: Some(tx),
            opened: AtomicUsize::new(0),
        };
        (Arc::new(app), rx)
    }

    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            redirects: None,
            opened: AtomicUsize::new(0),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlOpener for FakeBankApp {
    async fn can_open(&self, _url: &str) -> bool {
        true
    }

    async fn open(&self, _url: &str) -> bool {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if let Some(redirects) = &self.redirects {
            let _ = redirects.send(format!("{REDIRECT_URI}?code=auth-code&status=success"));
        }
        true
    }
}

/// Scripts every endpoint with the happy-path fixtures.
pub async fn script_happy_path(transport: &ScriptedTransport) {
    transport
        .always(endpoints::REMOTE_CONFIG, Ok(ok(fixture("remote_config"))))
        .await;
    transport
        .always(endpoints::CERT_CONFIG, Ok(ok(fixture("cert_config"))))
        .await;
    transport
        .always(endpoints::SESSION_ID, Ok(ok(fixture("session"))))
        .await;
    let mut auth = ok(fixture("auth"));
    auth.headers = vec![(
        "Set-Cookie".to_string(),
        "X-Sdk-Id-Key=id-1; Path=/, X-Sdk-Refresh-Data=refresh-1; Path=/".to_string(),
    )];
    transport.always(endpoints::AUTH, Ok(auth)).await;
    transport
        .always(endpoints::LIST_CARDS, Ok(ok(fixture("list_cards"))))
        .await;
    transport
        .always(endpoints::PAYMENT_PLAN, Ok(ok(fixture("payment_plan"))))
        .await;
    transport
        .always(endpoints::CREATE_OTP, Ok(ok(fixture("create_otp"))))
        .await;
    transport
        .always(endpoints::CONFIRM_OTP, Ok(ok(fixture("confirm_otp"))))
        .await;
    transport
        .always(endpoints::PAYMENT_TOKEN, Ok(ok(fixture("payment_token"))))
        .await;
    transport
        .always(endpoints::PAYMENT_ORDER, Ok(ok(fixture("payment_order"))))
        .await;
}

pub fn config() -> SdkConfig {
    SdkConfig {
        profile: NetworkProfile::Production,
        bnpl_enabled: true,
        session_timeout_secs: 120,
        ..Default::default()
    }
}

pub fn request() -> PaymentTokenRequest {
    PaymentTokenRequest {
        redirect_uri: REDIRECT_URI.to_string(),
        merchant_login: Some("shop".to_string()),
        order_id: Some("ORD1".to_string()),
        amount: Some(Balance::new(dec!(1000))),
        currency: Some("643".to_string()),
        order_number: Some("N-1".to_string()),
        ..Default::default()
    }
}

/// One SDK instance wired to scripted capabilities.
pub struct Harness {
    pub transport: ScriptedTransport,
    pub storage: InMemoryStorage,
    pub analytics: RecordingAnalytics,
    pub sdk: Arc<PaySdk>,
}

pub struct HarnessBuilder {
    config: SdkConfig,
    biometrics: StaticBiometrics,
    opener: Arc<dyn UrlOpener>,
    storage: InMemoryStorage,
}

impl HarnessBuilder {
    pub fn new(opener: Arc<dyn UrlOpener>) -> Self {
        Self {
            config: config(),
            biometrics: StaticBiometrics::new(false, false),
            opener,
            storage: InMemoryStorage::new(),
        }
    }

    pub fn config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn biometrics(mut self, biometrics: StaticBiometrics) -> Self {
        self.biometrics = biometrics;
        self
    }

    pub fn storage(mut self, storage: InMemoryStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn build(self) -> Harness {
        let transport = ScriptedTransport::new();
        let analytics = RecordingAnalytics::new();
        let sdk = PaySdk::builder(self.config)
            .transport(Arc::new(transport.clone()))
            .storage(Arc::new(self.storage.clone()))
            .analytics(Arc::new(analytics.clone()))
            .biometrics(Arc::new(self.biometrics))
            .url_opener(self.opener)
            .build()
            .unwrap();
        Harness {
            transport,
            storage: self.storage,
            analytics,
            sdk: Arc::new(sdk),
        }
    }
}

impl Harness {
    /// Starts a checkout and returns it with its event stream.
    pub async fn start(&self) -> (Checkout, mpsc::UnboundedReceiver<PresentationEvent>) {
        let (presenter, events) = ChannelPresenter::new();
        let checkout = self
            .sdk
            .get_payment_token(request(), Arc::new(presenter))
            .await
            .unwrap();
        (checkout, events)
    }

    /// Forwards bank-app redirects to the SDK, like a host's URL handler.
    pub fn forward_redirects(&self, mut redirects: mpsc::UnboundedReceiver<String>) {
        let sdk = self.sdk.clone();
        tokio::spawn(async move {
            while let Some(url) = redirects.recv().await {
                sdk.handle_redirect_url(&url).await;
            }
        });
    }

    /// Runs a checkout answered by `autopilot` to its end.
    pub async fn run_checkout(&self, autopilot: Autopilot) -> CheckoutOutcome {
        let (checkout, events) = self.start().await;
        let driver = tokio::spawn(autopilot.drive(events, checkout.handle().clone()));
        let outcome = checkout.outcome().await;
        driver.await.unwrap();
        outcome
    }
}

pub fn autopilot() -> Autopilot {
    Autopilot {
        otp_code: "000000".to_string(),
        ..Default::default()
    }
}

/// Waits for the first event matching `pred`, returning every event seen.
pub async fn wait_for<F>(
    events: &mut mpsc::UnboundedReceiver<PresentationEvent>,
    pred: F,
) -> Vec<PresentationEvent>
where
    F: Fn(&PresentationEvent) -> bool,
{
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        let done = pred(&event);
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}
