use super::installment::InstallmentService;
use super::user::UserService;
use crate::error::{Result, SdkError};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    UserData,
    InstallmentPlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Failure aborts the checkout.
    High,
    /// Failure is logged and the checkout goes on without it.
    Low,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load(&self, content: ContentType) -> Result<()>;
}

/// Loads several content types concurrently and applies the priority policy.
pub struct ContentLoadOrchestrator {
    source: Arc<dyn ContentSource>,
}

impl ContentLoadOrchestrator {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Starts every load at once and waits for all of them.
    ///
    /// Returns the first high-priority failure in request order.
    pub async fn load(&self, requests: &[(ContentType, Priority)]) -> Result<()> {
        let loads = requests.iter().map(|(content, priority)| {
            let source = self.source.clone();
            async move { (*content, *priority, source.load(*content).await) }
        });
        let results = join_all(loads).await;

        let mut first_failure: Option<SdkError> = None;
        for (content, priority, result) in results {
            match (result, priority) {
                (Ok(()), _) => debug!(?content, "content loaded"),
                (Err(err), Priority::Low) => {
                    warn!(?content, error = %err, "optional content failed to load")
                }
                (Err(err), Priority::High) => {
                    warn!(?content, error = %err, "required content failed to load");
                    first_failure.get_or_insert(err);
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

/// Per-checkout content backed by the user and installment services.
pub struct CheckoutContent {
    pub user: Arc<UserService>,
    pub installments: Arc<InstallmentService>,
}

#[async_trait]
impl ContentSource for CheckoutContent {
    async fn load(&self, content: ContentType) -> Result<()> {
        match content {
            ContentType::UserData => self.user.load().await,
            ContentType::InstallmentPlan => self.installments.load().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;
    use std::time::Duration;

    struct FakeSource {
        outcomes: HashMap<ContentType, Result<()>>,
        delays: HashMap<ContentType, Duration>,
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn load(&self, content: ContentType) -> Result<()> {
            if let Some(delay) = self.delays.get(&content) {
                tokio::time::sleep(*delay).await;
            }
            self.outcomes.get(&content).cloned().unwrap_or(Ok(()))
        }
    }

    fn orchestrator(user: Result<()>, plan: Result<()>) -> ContentLoadOrchestrator {
        ContentLoadOrchestrator::new(Arc::new(FakeSource {
            outcomes: HashMap::from([
                (ContentType::UserData, user),
                (ContentType::InstallmentPlan, plan),
            ]),
            delays: HashMap::new(),
        }))
    }

    const REQUESTS: [(ContentType, Priority); 2] = [
        (ContentType::UserData, Priority::High),
        (ContentType::InstallmentPlan, Priority::Low),
    ];

    #[tokio::test]
    async fn test_low_priority_failure_is_swallowed() {
        let result = orchestrator(Ok(()), Err(SdkError::TimeOut)).load(&REQUESTS).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_high_priority_failure_is_returned() {
        let result = orchestrator(Err(SdkError::NoCards), Ok(())).load(&REQUESTS).await;
        assert_eq!(result, Err(SdkError::NoCards));
    }

    #[tokio::test]
    async fn test_first_high_failure_in_request_order() {
        let requests = [
            (ContentType::InstallmentPlan, Priority::High),
            (ContentType::UserData, Priority::High),
        ];
        let result = orchestrator(Err(SdkError::NoCards), Err(SdkError::TimeOut))
            .load(&requests)
            .await;
        assert_eq!(result, Err(SdkError::TimeOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loads_run_concurrently() {
        let source = FakeSource {
            outcomes: HashMap::new(),
            delays: HashMap::from([
                (ContentType::UserData, Duration::from_secs(2)),
                (ContentType::InstallmentPlan, Duration::from_secs(3)),
            ]),
        };
        let started = tokio::time::Instant::now();
        ContentLoadOrchestrator::new(Arc::new(source))
            .load(&REQUESTS)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_random_outcomes_follow_priority_policy() {
        let mut rng = rand::thread_rng();
        let errors = [SdkError::NoData, SdkError::TimeOut, SdkError::BadResponse];
        for _ in 0..200 {
            let mut pick = || -> Result<()> {
                if rng.gen_bool(0.5) {
                    Ok(())
                } else {
                    Err(errors[rng.gen_range(0..errors.len())].clone())
                }
            };
            let user = pick();
            let plan = pick();
            let result = orchestrator(user.clone(), plan).load(&REQUESTS).await;
            assert_eq!(result, user);
        }
    }
}
