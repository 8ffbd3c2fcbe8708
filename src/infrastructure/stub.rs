//! Offline transport answering every request from canned fixtures.

use crate::domain::ports::{
    Fixture, FixtureLoader, FixtureLoaderBox, OutboundRequest, RawResponse, Transport,
    TransportError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Serves `{name}.json` from a directory, with an optional `{name}.cookie`
/// holding the `Set-Cookie` value for that response.
#[derive(Debug, Clone)]
pub struct DirectoryFixtures {
    dir: PathBuf,
}

impl DirectoryFixtures {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FixtureLoader for DirectoryFixtures {
    async fn load(&self, name: &str) -> Option<Fixture> {
        let body = match tokio::fs::read(self.dir.join(format!("{name}.json"))).await {
            Ok(body) => body,
            Err(e) => {
                warn!(fixture = name, error = %e, "fixture not found");
                return None;
            }
        };
        let set_cookie = tokio::fs::read_to_string(self.dir.join(format!("{name}.cookie")))
            .await
            .ok()
            .map(|cookie| cookie.trim().to_string())
            .filter(|cookie| !cookie.is_empty());
        Some(Fixture { body, set_cookie })
    }
}

/// Fixtures held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFixtures {
    fixtures: HashMap<String, Fixture>,
}

impl InMemoryFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, body: &str) -> Self {
        self.fixtures.insert(
            name.to_string(),
            Fixture {
                body: body.as_bytes().to_vec(),
                set_cookie: None,
            },
        );
        self
    }
}

#[async_trait]
impl FixtureLoader for InMemoryFixtures {
    async fn load(&self, name: &str) -> Option<Fixture> {
        self.fixtures.get(name).cloned()
    }
}

/// Answers with the fixture named by each request after a fixed delay.
pub struct StubTransport {
    fixtures: FixtureLoaderBox,
    delay: Duration,
}

impl StubTransport {
    pub fn new(fixtures: FixtureLoaderBox, delay: Duration) -> Self {
        Self { fixtures, delay }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let fixture = self
            .fixtures
            .load(request.fixture)
            .await
            .ok_or_else(|| TransportError::Other(format!("no fixture named {}", request.fixture)))?;
        debug!(fixture = request.fixture, "serving stub response");

        let headers = fixture
            .set_cookie
            .map(|cookie| vec![("Set-Cookie".to_string(), cookie)])
            .unwrap_or_default();
        Ok(RawResponse {
            status: 200,
            headers,
            body: fixture.body,
        })
    }
}
