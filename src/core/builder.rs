use std::sync::Arc;

use crate::config::RelayConfig;
use crate::engine::Engine;
use crate::resolver::Resolve;
use crate::subscribers::Subscribe;

use super::config::SupervisorConfig;
use super::supervisor::Supervisor;

/// Builder for a [`Supervisor`].
///
/// The relay config, loop config, resolver and engine are required; everything
/// else is optional.
pub struct SupervisorBuilder {
    relay: RelayConfig,
    cfg: SupervisorConfig,
    resolver: Arc<dyn Resolve>,
    engine: Arc<dyn Engine>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    pub fn new(
        relay: RelayConfig,
        cfg: SupervisorConfig,
        resolver: Arc<dyn Resolve>,
        engine: Arc<dyn Engine>,
    ) -> Self {
        Self {
            relay,
            cfg,
            resolver,
            engine,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue, started
    /// when the supervisor runs.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn build(self) -> Supervisor {
        Supervisor::new_internal(
            self.relay,
            self.cfg,
            self.resolver,
            self.engine,
            self.subscribers,
        )
    }
}
