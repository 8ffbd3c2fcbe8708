use crate::domain::credentials::AuthMethod;
use crate::domain::ports::{AnalyticsBox, AnalyticsEvent, BiometricsBox};
use crate::error::{Result, SdkError};
use async_trait::async_trait;
use tracing::{info, warn};

const BIO_AUTH_EVENT: &str = "BioAuth";

/// Interactive fallback used when local verification fails.
#[async_trait]
pub trait Reauthenticate: Send + Sync {
    async fn reauthenticate(&self) -> Result<()>;
}

/// Confirms the payer before token issuance.
pub struct VerificationEngine {
    biometrics: BiometricsBox,
    analytics: AnalyticsBox,
}

impl VerificationEngine {
    pub fn new(biometrics: BiometricsBox, analytics: AnalyticsBox) -> Self {
        Self {
            biometrics,
            analytics,
        }
    }

    /// Whether `method` needs a local check before paying.
    pub fn is_required(method: AuthMethod) -> bool {
        !matches!(method, AuthMethod::BankApp | AuthMethod::SessionIdOnly)
    }

    /// Verifies the payer according to how the session was authenticated.
    ///
    /// Bank-app and session-id sessions were verified by the bank already.
    /// Refresh sessions need a local biometric check; if it fails, the payer
    /// goes through the bank app again via `fallback`.
    pub async fn verify(&self, method: AuthMethod, fallback: &dyn Reauthenticate) -> Result<()> {
        match method {
            AuthMethod::BankApp | AuthMethod::SessionIdOnly => Ok(()),
            AuthMethod::RefreshToken => {
                if !self.biometrics.can_evaluate().await {
                    self.analytics.send(
                        AnalyticsEvent::fail(BIO_AUTH_EVENT).with("reason", "unavailable"),
                    );
                    warn!("biometric verification unavailable");
                    return Err(SdkError::NoData);
                }
                if self.biometrics.evaluate().await {
                    self.analytics.send(AnalyticsEvent::good(BIO_AUTH_EVENT));
                    info!("biometric verification passed");
                    return Ok(());
                }
                self.analytics
                    .send(AnalyticsEvent::fail(BIO_AUTH_EVENT).with("reason", "rejected"));
                info!("biometric verification rejected, falling back to bank app");
                fallback.reauthenticate().await
            }
            AuthMethod::None => Err(SdkError::NoData),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::AnalyticsOutcome;
    use crate::infrastructure::in_memory::{RecordingAnalytics, StaticBiometrics};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFallback {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Reauthenticate for CountingFallback {
        async fn reauthenticate(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn engine(bio: StaticBiometrics) -> (VerificationEngine, RecordingAnalytics) {
        let analytics = RecordingAnalytics::new();
        let engine = VerificationEngine::new(Arc::new(bio), Arc::new(analytics.clone()));
        (engine, analytics)
    }

    #[tokio::test]
    async fn test_bank_sessions_skip_verification() {
        let (engine, analytics) = engine(StaticBiometrics::new(false, false));
        let fallback = CountingFallback::default();
        assert!(engine.verify(AuthMethod::BankApp, &fallback).await.is_ok());
        assert!(engine.verify(AuthMethod::SessionIdOnly, &fallback).await.is_ok());
        assert!(analytics.events().is_empty());
        assert!(!VerificationEngine::is_required(AuthMethod::BankApp));
        assert!(VerificationEngine::is_required(AuthMethod::RefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_without_biometrics_fails() {
        let (engine, analytics) = engine(StaticBiometrics::new(false, true));
        let fallback = CountingFallback::default();
        assert_eq!(
            engine.verify(AuthMethod::RefreshToken, &fallback).await,
            Err(SdkError::NoData)
        );
        assert_eq!(analytics.events()[0].outcome, AnalyticsOutcome::Fail);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_with_biometrics_passes() {
        let (engine, analytics) = engine(StaticBiometrics::new(true, true));
        let fallback = CountingFallback::default();
        assert!(engine.verify(AuthMethod::RefreshToken, &fallback).await.is_ok());
        assert_eq!(analytics.events()[0].outcome, AnalyticsOutcome::Good);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_biometrics_fall_back_to_bank_app() {
        let (engine, _) = engine(StaticBiometrics::new(true, false));
        let fallback = CountingFallback::default();
        assert!(engine.verify(AuthMethod::RefreshToken, &fallback).await.is_ok());
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_session_fails() {
        let (engine, _) = engine(StaticBiometrics::new(true, true));
        assert_eq!(
            engine
                .verify(AuthMethod::None, &CountingFallback::default())
                .await,
            Err(SdkError::NoData)
        );
    }
}
