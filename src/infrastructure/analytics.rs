use crate::domain::ports::{AnalyticsEvent, AnalyticsOutcome, AnalyticsSink};
use tracing::info;

/// Default sink: writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn send(&self, event: AnalyticsEvent) {
        let outcome = match event.outcome {
            AnalyticsOutcome::Good => "good",
            AnalyticsOutcome::Fail => "fail",
        };
        info!(
            target: "spay_core::analytics",
            event = %event.name,
            outcome,
            properties = ?event.properties,
            "analytics event"
        );
    }
}
