//! Builder wiring the executor's collaborators.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::ExecutorConfig;
use crate::context::{ContextPropagator, NoopPropagator};
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::executor::ManagedExecutor;
use super::workers::{TokioWorkerFactory, WorkerFactory};

/// Builder for constructing a [`ManagedExecutor`] with optional
/// collaborators.
///
/// Must be built inside a Tokio runtime: `build()` spawns the event
/// forwarder, the subscriber workers, and (if configured) the background
/// monitor.
pub struct ExecutorBuilder {
    cfg: ExecutorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    propagator: Arc<dyn ContextPropagator>,
    factory: Arc<dyn WorkerFactory>,
}

impl ExecutorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: ExecutorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            propagator: Arc::new(NoopPropagator),
            factory: Arc::new(TokioWorkerFactory),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive executor events (lifecycle, shutdown, hung
    /// reports) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Sets the context-propagation provider (default: no propagation).
    pub fn with_propagator(mut self, propagator: Arc<dyn ContextPropagator>) -> Self {
        self.propagator = propagator;
        self
    }

    /// Sets the worker factory (default: `tokio::spawn`).
    pub fn with_factory(mut self, factory: Arc<dyn WorkerFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Builds the executor, wires the event fan-out, and starts accepting.
    pub fn build(self) -> Arc<ManagedExecutor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        spawn_forwarder(&bus, subs);

        let exec = ManagedExecutor::from_parts(self.cfg, bus, self.propagator, self.factory);
        exec.start();
        exec
    }
}

/// Forwards bus events to the subscriber set until the bus closes.
fn spawn_forwarder(bus: &Bus, subs: Arc<SubscriberSet>) {
    if subs.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => subs.emit(&ev),
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event forwarder lagged behind the bus");
                }
            }
        }
    });
}
