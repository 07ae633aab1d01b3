//! # Supervisor: the restart loop around one relay session at a time.
//!
//! The [`Supervisor`] owns the event bus, the subscriber fan-out and the
//! restart policy. It drives the state machine below until a fatal error or a
//! shutdown request.
//!
//! ```text
//!            ┌──────────────────────────────────────────────────────────────┐
//!            ▼                                                              │
//!      Resolving ──fatal──► Err(Resolution)                                 │
//!            │  └─transient─────────────────────────────────┐               │
//!            ▼                                              │               │
//!      Building ──invalid──► Err(Configuration)             │               │
//!            ▼                                              │               │
//!      Starting ──start failed──────────────────────────────┤               │
//!            ▼                                              │               │
//!      Running ──EOS / error / exit / empty output──► Draining ──► BackingOff
//! ```
//!
//! Cancellation is checked at every suspension point: during `Running` it
//! triggers a graceful stop and the loop exits with `Ok(())` without entering
//! `BackingOff`. A cancellation seen once a session has ended (while
//! `Draining`, or after a failed resolve or start) also skips `BackingOff`.
//! During `BackingOff` it cuts the sleep short.
//!
//! ## Invariants
//! - At most one pipeline handle exists at any time: a new session starts
//!   only after the previous [`Session`] returned, which implies its handle
//!   was reaped or killed and dropped.
//! - The endpoint is resolved again for every attempt.
//! - Every path without a running pipeline leads to `BackingOff`, never to
//!   idling.
//!
//! ## Event wiring
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► listener task ──► SubscriberSet ──► subscribers
//! ```
//! The listener is started by [`Supervisor::run`] and flushed before it returns;
//! subscribers get at most `stop_timeout` to drain, then they are aborted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::builder::SupervisorBuilder;
use super::config::SupervisorConfig;
use super::session::{Session, SessionEnd};
use super::shutdown;
use crate::config::RelayConfig;
use crate::engine::Engine;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind, SessionState};
use crate::pipeline::build;
use crate::policies::RestartTracker;
use crate::resolver::Resolve;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Outcome of one pass through `Resolving → … → Draining`.
enum Attempt {
    Cancelled,
    Ended {
        reason: String,
        ran_for: Option<Duration>,
    },
}

/// Supervises the relay: resolve, build, start, monitor, restart.
pub struct Supervisor {
    relay: RelayConfig,
    cfg: SupervisorConfig,
    resolver: Arc<dyn Resolve>,
    engine: Arc<dyn Engine>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    bus: Bus,
}

impl Supervisor {
    /// Starts building a supervisor.
    pub fn builder(
        relay: RelayConfig,
        cfg: SupervisorConfig,
        resolver: Arc<dyn Resolve>,
        engine: Arc<dyn Engine>,
    ) -> SupervisorBuilder {
        SupervisorBuilder::new(relay, cfg, resolver, engine)
    }

    pub(crate) fn new_internal(
        relay: RelayConfig,
        cfg: SupervisorConfig,
        resolver: Arc<dyn Resolve>,
        engine: Arc<dyn Engine>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            relay,
            cfg,
            resolver,
            engine,
            subscribers,
            bus,
        }
    }

    /// Bus the supervisor publishes on. Subscribe before calling [`run`](Self::run)
    /// to observe every event.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs until `token` is cancelled (`Ok(())`) or a fatal error occurs.
    ///
    /// # Errors
    /// - [`RuntimeError::Configuration`] the pipeline cannot be built from the config
    /// - [`RuntimeError::Resolution`] the control plane rejected the stream
    pub async fn run(&self, token: CancellationToken) -> Result<(), RuntimeError> {
        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());

        let result = self.supervise(&token).await;

        listener_stop.cancel();
        let _ = listener.await;
        result
    }

    /// Like [`run`](Self::run), cancelled by SIGINT / SIGTERM / SIGQUIT (Ctrl-C elsewhere).
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let signals = tokio::spawn(async move {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => {
                    info!(signal, "shutdown signal received");
                    trigger.cancel();
                }
                Err(e) => {
                    warn!(error = %e, "signal handlers unavailable; only fatal errors stop the relay");
                }
            }
        });
        let result = self.run(token).await;
        signals.abort();
        result
    }

    async fn supervise(&self, token: &CancellationToken) -> Result<(), RuntimeError> {
        let mut restarts = RestartTracker::new(self.cfg.backoff, self.cfg.healthy_after);
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            let (reason, ran_for) = match self.attempt(attempt, token).await? {
                Attempt::Cancelled => {
                    self.shutdown_requested();
                    return Ok(());
                }
                Attempt::Ended { reason, ran_for } => (reason, ran_for),
            };
            // cancelled while draining or after a retryable failure
            if token.is_cancelled() {
                self.shutdown_requested();
                return Ok(());
            }

            self.bus.publish(Event::state_changed(SessionState::BackingOff, attempt));
            let delay = restarts.next_delay(ran_for);
            self.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(reason),
            );

            tokio::select! {
                _ = token.cancelled() => {
                    self.shutdown_requested();
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt(&self, attempt: u32, token: &CancellationToken) -> Result<Attempt, RuntimeError> {
        if token.is_cancelled() {
            return Ok(Attempt::Cancelled);
        }
        let stream = self.relay.stream_name.as_str();

        self.bus.publish(Event::state_changed(SessionState::Resolving, attempt));
        let resolved = tokio::select! {
            _ = token.cancelled() => return Ok(Attempt::Cancelled),
            r = self.resolver.resolve(stream) => r,
        };
        let endpoint = match resolved {
            Ok(endpoint) => {
                debug!(attempt, endpoint = %endpoint.url, "endpoint resolved");
                endpoint
            }
            Err(e) if e.is_retryable() => {
                self.bus.publish(
                    Event::new(EventKind::ResolveFailed)
                        .with_attempt(attempt)
                        .with_reason(e.to_string()),
                );
                return Ok(Attempt::Ended {
                    reason: e.to_string(),
                    ran_for: None,
                });
            }
            Err(e) => {
                let err = RuntimeError::Resolution {
                    stream: stream.to_string(),
                    reason: e.to_string(),
                };
                return Err(self.fatal(attempt, err));
            }
        };

        self.bus.publish(Event::state_changed(SessionState::Building, attempt));
        let descriptor = build(&self.relay, &endpoint)
            .map_err(|e| self.fatal(attempt, RuntimeError::from(e)))?;

        self.bus.publish(Event::state_changed(SessionState::Starting, attempt));
        let handle = match self.engine.start(&descriptor).await {
            Ok(handle) => handle,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::StartFailed)
                        .with_attempt(attempt)
                        .with_reason(e.to_string()),
                );
                return Ok(Attempt::Ended {
                    reason: e.to_string(),
                    ran_for: None,
                });
            }
        };
        info!(attempt, pipeline = %descriptor, "pipeline started");

        match Session::new(attempt, &self.bus, &self.cfg).run(handle, token).await {
            SessionEnd::Cancelled => Ok(Attempt::Cancelled),
            SessionEnd::Terminated { reason, ran_for } => {
                self.bus.publish(
                    Event::new(EventKind::SessionEnded)
                        .with_attempt(attempt)
                        .with_delay(ran_for)
                        .with_reason(reason.to_string()),
                );
                Ok(Attempt::Ended {
                    reason: reason.to_string(),
                    ran_for: Some(ran_for),
                })
            }
        }
    }

    fn fatal(&self, attempt: u32, err: RuntimeError) -> RuntimeError {
        self.bus.publish(
            Event::new(EventKind::FatalError)
                .with_attempt(attempt)
                .with_reason(err.to_string()),
        );
        err
    }

    fn shutdown_requested(&self) {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
    }

    /// Forwards bus events to the subscribers until `stop`, then flushes.
    fn subscriber_listener(&self, stop: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());
        let grace = self.cfg.stop_timeout;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(n)) => warn!(skipped = n, "event listener lagged"),
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown(grace).await;
        })
    }
}
