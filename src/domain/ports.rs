use super::checkout::PresentationEvent;
use super::target::HttpMethod;
use async_trait::async_trait;
use std::io;
use std::sync::Arc;

/// Fully prepared HTTP request handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Fixture name answering this request in stub mode.
    pub fixture: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Values of every header named `name`, case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("host unreachable")]
    Offline,
    #[error("request timed out")]
    TimedOut,
    #[error("TLS failure: {0}")]
    Tls(String),
    #[error("transport failure: {0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// Small persistent string store (secure storage on device).
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> io::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> io::Result<()>;
    async fn remove(&self, key: &str) -> io::Result<()>;
}

#[async_trait]
pub trait BiometricAuth: Send + Sync {
    /// Whether the device can run a biometric or passcode check.
    async fn can_evaluate(&self) -> bool;
    /// Runs the check. `true` means the owner was recognised.
    async fn evaluate(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsOutcome {
    Good,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub outcome: AnalyticsOutcome,
    pub properties: Vec<(String, String)>,
}

impl AnalyticsEvent {
    pub fn good(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: AnalyticsOutcome::Good,
            properties: Vec::new(),
        }
    }

    pub fn fail(name: &str) -> Self {
        Self {
            outcome: AnalyticsOutcome::Fail,
            ..Self::good(name)
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.push((key.to_string(), value.into()));
        self
    }
}

pub trait AnalyticsSink: Send + Sync {
    fn send(&self, event: AnalyticsEvent);
}

#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn can_open(&self, url: &str) -> bool;
    async fn open(&self, url: &str) -> bool;
}

/// Renders presentation events. Implementations must not block.
pub trait Presenter: Send + Sync {
    fn present(&self, event: PresentationEvent);
}

/// Canned response served by the stub transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fixture {
    pub body: Vec<u8>,
    pub set_cookie: Option<String>,
}

#[async_trait]
pub trait FixtureLoader: Send + Sync {
    async fn load(&self, name: &str) -> Option<Fixture>;
}

pub type TransportBox = Arc<dyn Transport>;
pub type StorageBox = Arc<dyn KeyValueStorage>;
pub type BiometricsBox = Arc<dyn BiometricAuth>;
pub type AnalyticsBox = Arc<dyn AnalyticsSink>;
pub type UrlOpenerBox = Arc<dyn UrlOpener>;
pub type PresenterBox = Arc<dyn Presenter>;
pub type FixtureLoaderBox = Arc<dyn FixtureLoader>;
