//! # Session lifecycle events.
//!
//! Everything the supervisor wants an operator to see is published as an
//! [`Event`]: state transitions, failed attempts, scheduled restarts,
//! classified Warning/Fatal diagnostics and shutdown.
//!
//! Events never carry credentials. Reasons are error messages or pipeline
//! output lines; the source URL is never attached.
//!
//! ## Ordering
//! `seq` is process-wide and strictly increasing; use it to restore order
//! when events from different subscribers' queues are compared.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use relayvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(4))
//!     .with_reason("end of stream");
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(4_000));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::diagnostics::Severity;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// States of one session attempt.
///
/// ```text
/// Resolving → Building → Starting → Running → Draining → BackingOff ─┐
///     ▲                                                              │
///     └──────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Resolving,
    Building,
    Starting,
    Running,
    Draining,
    BackingOff,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Resolving => "resolving",
            SessionState::Building => "building",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Draining => "draining",
            SessionState::BackingOff => "backing_off",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Session lifecycle ===
    /// Supervisor entered a new state.
    ///
    /// Sets: `state`, `attempt`
    StateChanged,

    /// Endpoint resolution failed with a retryable error.
    ///
    /// Sets: `attempt`, `reason`
    ResolveFailed,

    /// The engine could not start the pipeline.
    ///
    /// Sets: `attempt`, `reason`
    StartFailed,

    /// The running pipeline reached a terminal condition.
    ///
    /// Sets: `attempt`, `reason` (terminal reason), `delay_ms` (time spent running)
    SessionEnded,

    /// Graceful stop did not finish within the stop timeout; the pipeline was killed.
    ///
    /// Sets: `attempt`, `delay_ms` (stop timeout)
    StopEscalated,

    /// Next attempt scheduled.
    ///
    /// Sets: `attempt` (the attempt that just ended), `delay_ms`, `reason`
    BackoffScheduled,

    // === Diagnostics ===
    /// A Warning or Fatal pipeline output line.
    ///
    /// Sets: `attempt`, `severity`, `reason` (the line)
    Diagnostic,

    /// Output lines were dropped because the diagnostic queue was full.
    ///
    /// Sets: `attempt`, `reason` (count)
    DiagnosticsDropped,

    // === Process ===
    /// Shutdown requested (cancellation token or OS signal).
    ShutdownRequested,

    /// Supervisor stopped after a non-retryable error.
    ///
    /// Sets: `attempt`, `reason`
    FatalError,

    // === Subscribers ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (subscriber name and panic info)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`
    SubscriberOverflow,
}

/// Supervisor event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    pub kind: EventKind,

    /// Session attempt number (1-based).
    pub attempt: Option<u32>,
    /// State entered (only for [`EventKind::StateChanged`]).
    pub state: Option<SessionState>,
    /// Delay or duration in milliseconds, depending on `kind`.
    pub delay_ms: Option<u64>,
    /// Severity of a diagnostic line.
    pub severity: Option<Severity>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates an event with the current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            attempt: None,
            state: None,
            delay_ms: None,
            severity: None,
            reason: None,
        }
    }

    /// Shorthand for a [`EventKind::StateChanged`] event.
    pub fn state_changed(state: SessionState, attempt: u32) -> Self {
        let mut ev = Event::new(EventKind::StateChanged).with_attempt(attempt);
        ev.state = Some(state);
        ev
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a delay or duration (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[inline]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::ShutdownRequested);
        let b = Event::new(EventKind::ShutdownRequested);
        assert!(b.seq > a.seq, "seq must increase: {} then {}", a.seq, b.seq);
    }

    #[test]
    fn test_state_changed_sets_state_and_attempt() {
        let ev = Event::state_changed(SessionState::Draining, 7);
        assert_eq!(ev.kind, EventKind::StateChanged);
        assert_eq!(ev.state, Some(SessionState::Draining));
        assert_eq!(ev.attempt, Some(7));
        assert_eq!(SessionState::BackingOff.to_string(), "backing_off");
    }

    #[test]
    fn test_internal_events() {
        assert!(Event::subscriber_overflow("log", "full").is_internal());
        assert!(!Event::new(EventKind::Diagnostic).is_internal());
    }
}
