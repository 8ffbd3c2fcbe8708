use std::time::Duration;
use tokio::time::Instant;

/// Countdown for one checkout that keeps running while the app is in the
/// background.
///
/// Every timestamp comes from the caller, so the host decides what "now"
/// means for background and foreground transitions.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    timeout: Duration,
    deadline: Option<Instant>,
    background_since: Option<Instant>,
}

impl SessionTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
            background_since: None,
        }
    }

    pub fn start(&mut self, at: Instant) {
        self.deadline = Some(at + self.timeout);
        self.background_since = None;
    }

    pub fn stop(&mut self) {
        self.deadline = None;
        self.background_since = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn on_background(&mut self, at: Instant) {
        if self.deadline.is_some() && self.background_since.is_none() {
            self.background_since = Some(at);
        }
    }

    /// Resumes ticking. Time spent in the background still counts against
    /// the checkout.
    pub fn on_foreground(&mut self, at: Instant) {
        if self.background_since.take().is_some() {
            tracing::debug!(remaining = ?self.remaining(at), "checkout timer resumed");
        }
    }

    pub fn remaining(&self, at: Instant) -> Duration {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(at))
            .unwrap_or(self.timeout)
    }

    pub fn is_expired(&self, at: Instant) -> bool {
        self.deadline.is_some_and(|deadline| at >= deadline)
    }

    /// Instant at which an armed, foreground timer fires.
    ///
    /// `None` while stopped or backgrounded. Expiry is then detected when the
    /// app returns to the foreground.
    pub fn deadline(&self) -> Option<Instant> {
        match self.background_since {
            Some(_) => None,
            None => self.deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_time_counts_against_timeout() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(Duration::from_secs(120));
        timer.start(t0);

        timer.on_background(t0);
        assert!(timer.deadline().is_none());
        timer.on_foreground(t0 + Duration::from_secs(30));

        assert_eq!(
            timer.remaining(t0 + Duration::from_secs(30)),
            Duration::from_secs(90)
        );
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_secs(120)));
    }

    #[test]
    fn test_expires_in_background() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(Duration::from_secs(10));
        timer.start(t0);
        timer.on_background(t0 + Duration::from_secs(1));
        timer.on_foreground(t0 + Duration::from_secs(60));
        assert!(timer.is_expired(t0 + Duration::from_secs(60)));
        assert_eq!(timer.remaining(t0 + Duration::from_secs(60)), Duration::ZERO);
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(Duration::from_secs(5));
        assert!(!timer.is_running());
        timer.start(t0);
        timer.stop();
        assert!(timer.deadline().is_none());
        assert!(!timer.is_expired(t0 + Duration::from_secs(100)));
    }
}
