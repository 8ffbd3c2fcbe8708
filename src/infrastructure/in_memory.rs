use crate::domain::ports::{
    AnalyticsEvent, AnalyticsSink, BiometricAuth, KeyValueStorage, OutboundRequest, RawResponse,
    Transport, TransportError, UrlOpener,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Key-value storage that lives as long as the process.
///
/// Clones share one map. Hosts that need cookies and the cached config to
/// survive a relaunch use the RocksDB storage instead.
#[derive(Default, Clone)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStorage for InMemoryStorage {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

type Scripted = Result<RawResponse, TransportError>;

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<Scripted>>,
    sticky: HashMap<String, Scripted>,
    hanging: HashSet<String>,
    requests: Vec<OutboundRequest>,
}

/// Transport answering from per-path scripts and recording every request.
///
/// Queued responses are served first, then the sticky one. Paths with no
/// script answer 404.
#[derive(Default, Clone)]
pub struct ScriptedTransport {
    script: Arc<RwLock<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot response for `path`.
    pub async fn push(&self, path: &str, response: Scripted) {
        let mut script = self.script.write().await;
        script
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answers every otherwise unscripted call to `path` with `response`.
    pub async fn always(&self, path: &str, response: Scripted) {
        let mut script = self.script.write().await;
        script.sticky.insert(path.to_string(), response);
    }

    /// Calls to `path` never complete.
    pub async fn hang(&self, path: &str) {
        let mut script = self.script.write().await;
        script.hanging.insert(path.to_string());
    }

    pub async fn requests(&self) -> Vec<OutboundRequest> {
        self.script.read().await.requests.clone()
    }

    pub async fn count(&self, path: &str) -> usize {
        let script = self.script.read().await;
        script.requests.iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let path = request.path.clone();
        let answer = {
            let mut script = self.script.write().await;
            script.requests.push(request);
            if script.hanging.contains(&path) {
                None
            } else {
                let queued = script.queued.get_mut(&path).and_then(VecDeque::pop_front);
                Some(queued.or_else(|| script.sticky.get(&path).cloned()).unwrap_or(Ok(
                    RawResponse {
                        status: 404,
                        ..Default::default()
                    },
                )))
            }
        };
        match answer {
            Some(answer) => answer,
            None => std::future::pending().await,
        }
    }
}

/// Analytics sink that keeps every event for later inspection.
#[derive(Default, Clone)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn send(&self, event: AnalyticsEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Biometric capability with fixed answers.
#[derive(Debug, Clone, Copy)]
pub struct StaticBiometrics {
    pub available: bool,
    pub succeeds: bool,
}

impl StaticBiometrics {
    pub fn new(available: bool, succeeds: bool) -> Self {
        Self { available, succeeds }
    }
}

#[async_trait]
impl BiometricAuth for StaticBiometrics {
    async fn can_evaluate(&self) -> bool {
        self.available
    }

    async fn evaluate(&self) -> bool {
        self.available && self.succeeds
    }
}

/// Opener for hosts without any bank app installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBankApps;

#[async_trait]
impl UrlOpener for NoBankApps {
    async fn can_open(&self, _url: &str) -> bool {
        false
    }

    async fn open(&self, _url: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::target::HttpMethod;

    fn request(path: &str) -> OutboundRequest {
        OutboundRequest {
            method: HttpMethod::Get,
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            fixture: "none",
        }
    }

    #[tokio::test]
    async fn test_in_memory_storage() {
        let storage = InMemoryStorage::new();
        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));

        storage.remove("k").await.unwrap();
        assert!(storage.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scripted_transport_order() {
        let transport = ScriptedTransport::new();
        transport.push("a", Ok(RawResponse::ok("first"))).await;
        transport.always("a", Ok(RawResponse::ok("sticky"))).await;

        let first = transport.send(request("a")).await.unwrap();
        let second = transport.send(request("a")).await.unwrap();
        let missing = transport.send(request("b")).await.unwrap();
        assert_eq!(first.body, b"first");
        assert_eq!(second.body, b"sticky");
        assert_eq!(missing.status, 404);
        assert_eq!(transport.count("a").await, 2);
    }

    #[test]
    fn test_recording_analytics() {
        let sink = RecordingAnalytics::new();
        sink.send(AnalyticsEvent::good("Setup"));
        assert_eq!(sink.events().len(), 1);
    }
}
