//! # LogWriter: events to `tracing`
//!
//! Renders every supervisor event as one structured `tracing` record.
//!
//! ## Example output (text format)
//! ```text
//! INFO  state=resolving attempt=1 session state changed
//! WARN  attempt=1 reason="control plane unreachable: ..." endpoint resolution failed
//! INFO  attempt=1 reason="end of stream" ran_ms=2000 session ended
//! INFO  attempt=1 delay_ms=1000 reason="end of stream" restart scheduled
//! WARN  attempt=2 line="WARNING: from element ..." pipeline warning
//! ERROR attempt=2 line="ERROR: from element ..." pipeline error
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::diagnostics::Severity;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Built-in subscriber writing events through `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or_default();
        match e.kind {
            EventKind::StateChanged => {
                info!(
                    state = e.state.map(|s| s.as_str()),
                    attempt = e.attempt,
                    "session state changed"
                );
            }
            EventKind::ResolveFailed => {
                warn!(attempt = e.attempt, reason, "endpoint resolution failed");
            }
            EventKind::StartFailed => {
                warn!(attempt = e.attempt, reason, "pipeline failed to start");
            }
            EventKind::SessionEnded => {
                info!(attempt = e.attempt, reason, ran_ms = e.delay_ms, "session ended");
            }
            EventKind::StopEscalated => {
                warn!(
                    attempt = e.attempt,
                    timeout_ms = e.delay_ms,
                    "graceful stop timed out, pipeline killed"
                );
            }
            EventKind::BackoffScheduled => {
                info!(
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    reason,
                    "restart scheduled"
                );
            }
            EventKind::Diagnostic => match e.severity {
                Some(Severity::Fatal) => error!(attempt = e.attempt, line = reason, "pipeline error"),
                Some(Severity::Warning) => warn!(attempt = e.attempt, line = reason, "pipeline warning"),
                _ => info!(attempt = e.attempt, line = reason, "pipeline output"),
            },
            EventKind::DiagnosticsDropped => {
                warn!(attempt = e.attempt, dropped = reason, "pipeline output lines dropped");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::FatalError => {
                error!(attempt = e.attempt, reason, "supervisor stopped");
            }
            EventKind::SubscriberOverflow => {
                warn!(reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }

    fn queue_capacity(&self) -> usize {
        2048
    }
}
