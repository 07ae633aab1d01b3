//! # Restart tracking across sessions.
//!
//! [`RestartTracker`] turns a [`BackoffPolicy`] into the delay schedule the
//! supervisor applies between `Terminated` and the next `Resolving`.
//!
//! ```text
//! session ends ──► ran >= healthy_after ? ──yes──► failures = 0
//!                                        └─no───► keep counting
//!              ──► delay = backoff.delay(failures); failures += 1
//! ```
//!
//! Sessions that never reached `Running` (resolution or start failures) always
//! count as unhealthy.

use std::time::Duration;

use super::BackoffPolicy;

/// Consecutive-failure counter feeding the backoff policy.
#[derive(Clone, Debug)]
pub struct RestartTracker {
    backoff: BackoffPolicy,
    healthy_after: Duration,
    failures: u32,
}

impl RestartTracker {
    /// Creates a tracker with no recorded failures.
    pub fn new(backoff: BackoffPolicy, healthy_after: Duration) -> Self {
        Self {
            backoff,
            healthy_after,
            failures: 0,
        }
    }

    /// Computes the delay before the next session.
    ///
    /// `running_for` is how long the finished session stayed `Running`
    /// (`None` if it never started).
    pub fn next_delay(&mut self, running_for: Option<Duration>) -> Duration {
        if running_for.is_some_and(|d| d >= self.healthy_after) {
            self.failures = 0;
        }
        let delay = self.backoff.delay(self.failures);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Number of consecutive unhealthy sessions recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> RestartTracker {
        RestartTracker::new(
            BackoffPolicy {
                first: Duration::from_secs(1),
                max: Duration::from_secs(8),
                factor: 2.0,
                jitter: 0.0,
            },
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_delays_grow_to_cap_on_consecutive_failures() {
        let mut t = tracker();
        let delays: Vec<_> = (0..6).map(|_| t.next_delay(None).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn test_short_run_does_not_reset() {
        let mut t = tracker();
        t.next_delay(None);
        t.next_delay(Some(Duration::from_secs(5)));
        assert_eq!(t.next_delay(Some(Duration::from_secs(29))), Duration::from_secs(4));
    }

    #[test]
    fn test_healthy_run_resets_schedule() {
        let mut t = tracker();
        for _ in 0..4 {
            t.next_delay(None);
        }
        assert_eq!(t.failures(), 4);
        assert_eq!(t.next_delay(Some(Duration::from_secs(30))), Duration::from_secs(1));
        assert_eq!(t.failures(), 1);
    }
}
