//! # SubscriberSet: non-blocking fan-out
//!
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```
//!
//! - `emit` returns immediately; order is FIFO per subscriber only.
//! - A full or closed queue drops the event for that subscriber and publishes
//!   `SubscriberOverflow` (never for an overflow event itself).
//! - `shutdown` waits a bounded time for the queues to drain, then aborts.
//! - A panicking subscriber publishes `SubscriberPanicked` (unless it panicked
//!   on an internal event) and keeps receiving later events.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use crate::events::{Bus, Event};

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker per subscriber.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            workers.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    let internal = ev.is_internal();
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        if internal {
                            continue;
                        }
                        let info = panic
                            .downcast_ref::<&str>()
                            .map(|s| (*s).to_string())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".into());
                        worker_bus.publish(Event::subscriber_panicked(name, info));
                    }
                }
            }));
            channels.push(SubscriberChannel { name, sender: tx });
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Fans out one event to all subscribers without waiting.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !event.is_internal() {
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes all queues and waits up to `grace` for the workers to drain them.
    ///
    /// Workers still busy after `grace` are aborted.
    pub async fn shutdown(self, grace: Duration) {
        drop(self.channels);
        let mut workers = self.workers;
        let drained = tokio::time::timeout(grace, async {
            for h in workers.iter_mut() {
                let _ = h.await;
            }
        })
        .await;

        if drained.is_err() {
            let stuck = workers.iter().filter(|h| !h.is_finished()).count();
            warn!(stuck, grace_ms = grace.as_millis() as u64, "aborting subscribers that did not drain");
            for h in &workers {
                h.abort();
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn test_events_reach_every_subscriber() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Counter(Arc::clone(&a))),
                Arc::new(Counter(Arc::clone(&b))),
            ],
            Bus::new(16),
        );
        assert_eq!(set.len(), 2);
        for _ in 0..3 {
            set.emit(&Event::new(EventKind::ShutdownRequested));
        }
        set.shutdown(Duration::from_secs(1)).await;
        assert_eq!(a.load(Ordering::SeqCst), 3);
        assert_eq!(b.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let count = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![Arc::new(Panicky), Arc::new(Counter(Arc::clone(&count)))],
            bus,
        );
        set.emit(&Event::new(EventKind::Diagnostic));
        set.emit(&Event::new(EventKind::Diagnostic));
        set.shutdown(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert!(ev.reason.as_deref().unwrap().contains("subscriber=panicky"));
    }

    struct Stuck;

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, _ev: &Event) {
            std::future::pending::<()>().await;
        }
        fn name(&self) -> &'static str {
            "stuck"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_full_queue_publishes_overflow_once_per_drop() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Stuck)], bus);

        // first event is taken by the worker, second fills the queue
        for _ in 0..2 {
            set.emit(&Event::new(EventKind::Diagnostic));
            tokio::task::yield_now().await;
        }
        set.emit(&Event::new(EventKind::Diagnostic));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);

        // overflow events never cascade
        set.emit(&ev);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_stuck_subscriber_after_grace() {
        let count = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![Arc::new(Stuck), Arc::new(Counter(Arc::clone(&count)))],
            Bus::new(16),
        );
        set.emit(&Event::new(EventKind::ShutdownRequested));

        let started = tokio::time::Instant::now();
        tokio::time::timeout(Duration::from_secs(60), set.shutdown(Duration::from_secs(5)))
            .await
            .expect("shutdown must not hang on a stuck subscriber");
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 1, "healthy subscriber still drained");
    }
}
