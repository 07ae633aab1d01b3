//! # Supervisor runtime configuration.
//!
//! [`SupervisorConfig`] holds the knobs of the restart loop itself, as opposed
//! to [`RelayConfig`](crate::RelayConfig) which describes *what* is relayed.
//!
//! ## Sentinel values
//! - `bus_capacity` and `diagnostic_queue` are clamped to a minimum of 1.

use std::time::Duration;

use crate::config::Cli;
use crate::error::ConfigError;
use crate::policies::BackoffPolicy;

/// Configuration for the supervisor loop.
///
/// ## Field semantics
/// - `backoff`: delay schedule between a terminated session and the next resolve
/// - `healthy_after`: a session running at least this long resets the schedule
/// - `stop_timeout`: wait after a graceful stop request before force-killing
/// - `diagnostic_queue`: capacity of the queue fed by the output readers
/// - `bus_capacity`: event bus ring buffer size
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Restart delay schedule.
    pub backoff: BackoffPolicy,

    /// Minimum `Running` time for a session to count as healthy.
    pub healthy_after: Duration,

    /// Maximum time to wait for a pipeline to stop after a graceful stop request.
    ///
    /// When exceeded the pipeline is force-terminated.
    pub stop_timeout: Duration,

    /// Capacity of the bounded diagnostic queue.
    ///
    /// Readers never block on it: lines that do not fit are dropped and counted.
    pub diagnostic_queue: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Builds the supervisor configuration from raw input.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if !(cli.backoff_factor.is_finite() && cli.backoff_factor >= 1.0) {
            return Err(ConfigError::Invalid {
                name: "backoff factor",
                reason: format!("{} is not a finite number >= 1", cli.backoff_factor),
            });
        }
        if !(0.0..=1.0).contains(&cli.backoff_jitter) {
            return Err(ConfigError::Invalid {
                name: "backoff jitter",
                reason: format!("{} is outside [0, 1]", cli.backoff_jitter),
            });
        }
        if cli.backoff_factor < 1.0 + cli.backoff_jitter {
            return Err(ConfigError::Invalid {
                name: "backoff factor",
                reason: format!(
                    "{} is below 1 + jitter ({}); delays could shrink between failures",
                    cli.backoff_factor,
                    1.0 + cli.backoff_jitter
                ),
            });
        }
        if cli.backoff_first_ms > cli.backoff_max_ms {
            return Err(ConfigError::Invalid {
                name: "backoff",
                reason: format!(
                    "first delay {}ms exceeds cap {}ms",
                    cli.backoff_first_ms, cli.backoff_max_ms
                ),
            });
        }

        Ok(Self {
            backoff: BackoffPolicy {
                first: Duration::from_millis(cli.backoff_first_ms),
                max: Duration::from_millis(cli.backoff_max_ms),
                factor: cli.backoff_factor,
                jitter: cli.backoff_jitter,
            },
            healthy_after: Duration::from_secs(cli.healthy_after_secs),
            stop_timeout: Duration::from_secs(cli.stop_timeout_secs),
            diagnostic_queue: cli.diagnostic_queue,
            ..Self::default()
        })
    }

    /// Returns the diagnostic queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn diagnostic_queue_clamped(&self) -> usize {
        self.diagnostic_queue.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `backoff = BackoffPolicy::default()` (1s doubling to 60s)
    /// - `healthy_after = 30s`
    /// - `stop_timeout = 10s`
    /// - `diagnostic_queue = 1024`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            healthy_after: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(10),
            diagnostic_queue: 1024,
            bus_capacity: 1024,
        }
    }
}
