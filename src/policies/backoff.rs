//! # Backoff policy between relay sessions.
//!
//! [`BackoffPolicy`] controls how the wait before the next session grows after
//! consecutive failures. It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::jitter`] a fraction of the base delay added on top at random.
//!
//! The delay for failure `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! plus up to `jitter × base`, clamped to `max` again. The base is derived from `n`
//! alone, so jitter never feeds back into later delays.
//!
//! With `factor >= 1 + jitter` the sequence of delays is non-decreasing until it
//! reaches `max`, and stays at `max` afterwards.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use relayvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: 0.0,
//! };
//!
//! assert_eq!(backoff.delay(0), Duration::from_millis(500));
//! assert_eq!(backoff.delay(1), Duration::from_secs(1));
//! assert_eq!(backoff.delay(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use rand::Rng;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0`).
    pub factor: f64,
    /// Random extra delay as a fraction of the base, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 1s`;
    /// - `max = 60s`;
    /// - `factor = 2.0`;
    /// - `jitter = 0.0`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: 0.0,
        }
    }
}

impl BackoffPolicy {
    /// Fixed delay: every restart waits `every`.
    pub fn fixed(every: Duration) -> Self {
        Self {
            first: every,
            max: every,
            factor: 1.0,
            jitter: 0.0,
        }
    }

    /// Base delay (no jitter) for the given consecutive-failure count.
    pub fn base(&self, failures: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = failures.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Delay to wait after `failures` consecutive failed sessions (0-indexed).
    pub fn delay(&self, failures: u32) -> Duration {
        let base = self.base(failures);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || base.is_zero() {
            return base;
        }

        let extra_ms = (base.as_millis() as f64 * jitter) as u64;
        if extra_ms == 0 {
            return base;
        }
        let extra = Duration::from_millis(rand::rng().random_range(0..=extra_ms));
        (base + extra).min(self.max)
    }
}
