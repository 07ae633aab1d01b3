//! # One running session: `Running` → `Draining`.
//!
//! A [`Session`] owns exactly one [`PipelineHandle`] from the moment the engine
//! returned it until the execution unit has been reaped (or killed).
//!
//! ```text
//! Running:
//!   select! {
//!     token.cancelled()          → trigger Cancelled
//!     handle.wait()              → trigger Exited(code)
//!     queue.recv() terminal      → trigger Diagnostic(reason)
//!     queue closed (both EOF)    → trigger OutputsClosed
//!   }
//! Draining:
//!   interrupt() unless already exited
//!   within stop_timeout: collect exit code + keep draining output
//!   else: kill() + reap
//!   abort leftover readers
//! ```
//!
//! Output is drained during both phases, so the pipeline never blocks on a
//! full pipe while it is being asked to stop.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::core::config::SupervisorConfig;
use crate::diagnostics::{DiagnosticEvent, DiagnosticQueue, Severity, TerminalReason, spawn_readers};
use crate::engine::PipelineHandle;
use crate::events::{Bus, Event, EventKind, SessionState};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// Shutdown was requested; the pipeline has been stopped.
    Cancelled,
    /// The pipeline reached a terminal condition and has been stopped.
    Terminated {
        reason: TerminalReason,
        ran_for: Duration,
    },
}

/// What ended the `Running` phase.
enum Trigger {
    Cancelled,
    Diagnostic(TerminalReason),
    Exited(Option<i32>),
    OutputsClosed,
}

pub(crate) struct Session<'a> {
    attempt: u32,
    bus: &'a Bus,
    cfg: &'a SupervisorConfig,
}

impl<'a> Session<'a> {
    pub(crate) fn new(attempt: u32, bus: &'a Bus, cfg: &'a SupervisorConfig) -> Self {
        Self { attempt, bus, cfg }
    }

    /// Drives `handle` until it is terminated and released.
    pub(crate) async fn run(
        &self,
        mut handle: Box<dyn PipelineHandle>,
        token: &CancellationToken,
    ) -> SessionEnd {
        let started = Instant::now();
        let mut readers = JoinSet::new();
        let mut queue = match handle.take_outputs() {
            Ok(outputs) => spawn_readers(outputs, self.cfg.diagnostic_queue_clamped(), &mut readers),
            Err(e) => {
                // unmonitored pipelines are not allowed to keep running
                self.enter(SessionState::Draining);
                handle.kill().await;
                return SessionEnd::Terminated {
                    reason: TerminalReason::Error(e.to_string()),
                    ran_for: Duration::ZERO,
                };
            }
        };

        self.enter(SessionState::Running);
        debug!(attempt = self.attempt, pid = ?handle.id(), "pipeline running");

        let mut outputs_open = true;
        let trigger = loop {
            tokio::select! {
                _ = token.cancelled() => break Trigger::Cancelled,
                code = handle.wait() => break Trigger::Exited(code),
                ev = queue.rx.recv(), if outputs_open => match ev {
                    Some(ev) => {
                        if let Some(reason) = self.report(ev) {
                            break Trigger::Diagnostic(reason);
                        }
                    }
                    None => outputs_open = false,
                },
            }
            if !outputs_open {
                break Trigger::OutputsClosed;
            }
        };
        let ran_for = started.elapsed();

        self.enter(SessionState::Draining);
        let exit = match &trigger {
            Trigger::Exited(code) => Some(*code),
            _ => None,
        };
        let (exit, late) = self.drain(handle.as_mut(), &mut queue, exit, outputs_open).await;
        readers.shutdown().await;
        drop(handle);

        let dropped = queue.dropped();
        if dropped > 0 {
            self.bus.publish(
                Event::new(EventKind::DiagnosticsDropped)
                    .with_attempt(self.attempt)
                    .with_reason(dropped.to_string()),
            );
        }

        let reason = match trigger {
            Trigger::Cancelled => return SessionEnd::Cancelled,
            Trigger::Diagnostic(reason) => reason,
            Trigger::Exited(_) | Trigger::OutputsClosed => {
                late.unwrap_or(TerminalReason::ProcessExited(exit.flatten()))
            }
        };
        SessionEnd::Terminated { reason, ran_for }
    }

    /// Stops the pipeline and keeps reading its output until it is gone.
    ///
    /// Returns the exit code (if collected) and the first terminal reason seen
    /// while draining.
    async fn drain(
        &self,
        handle: &mut dyn PipelineHandle,
        queue: &mut DiagnosticQueue,
        mut exit: Option<Option<i32>>,
        mut outputs_open: bool,
    ) -> (Option<Option<i32>>, Option<TerminalReason>) {
        if exit.is_none() {
            handle.interrupt();
        }

        let mut late = None;
        let stopped = timeout(self.cfg.stop_timeout, async {
            loop {
                tokio::select! {
                    code = handle.wait(), if exit.is_none() => exit = Some(code),
                    ev = queue.rx.recv(), if outputs_open => match ev {
                        Some(ev) => {
                            let reason = self.report(ev);
                            if late.is_none() {
                                late = reason;
                            }
                        }
                        None => outputs_open = false,
                    },
                    else => break,
                }
            }
        })
        .await;

        if stopped.is_err() && exit.is_none() {
            self.bus.publish(
                Event::new(EventKind::StopEscalated)
                    .with_attempt(self.attempt)
                    .with_delay(self.cfg.stop_timeout),
            );
            handle.kill().await;
            exit = Some(None);
        }
        (exit, late)
    }

    /// Logs / publishes one diagnostic and returns its terminal reason, if any.
    fn report(&self, ev: DiagnosticEvent) -> Option<TerminalReason> {
        match ev.severity {
            Severity::Info => {
                trace!(attempt = self.attempt, channel = ev.channel.as_str(), line = %ev.line, "pipeline output");
            }
            Severity::Warning | Severity::Fatal => {
                self.bus.publish(
                    Event::new(EventKind::Diagnostic)
                        .with_attempt(self.attempt)
                        .with_severity(ev.severity)
                        .with_reason(ev.line),
                );
            }
        }
        ev.terminal
    }

    fn enter(&self, state: SessionState) {
        self.bus.publish(Event::state_changed(state, self.attempt));
    }
}
