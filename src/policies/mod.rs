//! Restart and backoff policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how restart delays evolve (first / factor / max + jitter)
//! - [`RestartTracker`] consecutive-failure counter with healthy-run reset
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { backoff: BackoffPolicy, healthy_after: Duration, .. }
//!      └─► core::Supervisor owns one RestartTracker:
//!           - next_delay(running_for) after every terminated attempt
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=1s, factor=2.0, max=60s, jitter=0.
//! - `healthy_after` = 30s (see [`SupervisorConfig`](crate::SupervisorConfig)).

mod backoff;
mod restart;

pub use backoff::BackoffPolicy;
pub use restart::RestartTracker;
