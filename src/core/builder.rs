use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    backend::{Clock, LogTarget, SystemClock, Syncer},
    core::{AppenderConfig, coordinator::Coordinator, queue::RequestQueue},
    events::Bus,
    subscribers::Subscribe,
};

use super::appender::Appender;

/// Builder for constructing an [`Appender`] around a storage backend.
pub struct AppenderBuilder {
    cfg: AppenderConfig,
    target: Box<dyn LogTarget>,
    syncer: Arc<dyn Syncer>,
    clock: Arc<dyn Clock>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl AppenderBuilder {
    /// Creates a new builder for the given configuration and backend.
    ///
    /// With the `logging` feature the builder starts with a [`LogWriter`](crate::LogWriter)
    /// subscriber; [`with_subscribers`](Self::with_subscribers) replaces it.
    pub fn new(cfg: AppenderConfig, target: impl LogTarget, syncer: impl Syncer) -> Self {
        Self {
            cfg,
            target: Box::new(target),
            syncer: Arc::new(syncer),
            clock: Arc::new(SystemClock),
            subscribers: default_subscribers(),
        }
    }

    /// Sets the time source (defaults to [`SystemClock`]).
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Same as [`with_clock`](Self::with_clock) for a clock the caller keeps a handle to.
    pub fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (flushes, sync results, failures)
    /// through dedicated workers with bounded queues. An empty list disables
    /// the default logging subscriber.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the appender in the `Uninitialized` state.
    ///
    /// Nothing is spawned here; background tasks start on
    /// [`Appender::activate`].
    pub fn build(self) -> Arc<Appender> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let (queue, receiver) = RequestQueue::new();
        let shutdown = CancellationToken::new();

        let coordinator = Arc::new(Coordinator::new(
            &self.cfg,
            self.target,
            queue,
            bus.clone(),
            self.clock,
            shutdown.clone(),
        ));

        Arc::new(Appender::new_internal(
            coordinator,
            self.syncer,
            bus,
            shutdown,
            self.cfg.check_period_clamped(),
            receiver,
            self.subscribers,
        ))
    }
}

#[cfg(feature = "logging")]
fn default_subscribers() -> Vec<Arc<dyn Subscribe>> {
    vec![Arc::new(crate::subscribers::LogWriter)]
}

#[cfg(not(feature = "logging"))]
fn default_subscribers() -> Vec<Arc<dyn Subscribe>> {
    Vec::new()
}
