//! # Context propagation port.
//!
//! A [`ContextPropagator`] carries ambient invocation context (security
//! principal, locale, trace ids, ...) across the submit/execute boundary:
//!
//! - [`ContextPropagator::capture`] runs on the submitting execution unit
//!   and produces an opaque [`ContextSnapshot`] stored on the envelope;
//! - [`ContextPropagator::apply`] runs on the worker, right before the
//!   payload, and returns a [`ContextGuard`];
//! - dropping the guard performs the reset — on every exit path, including
//!   payload failure.
//!
//! The snapshot is owned exclusively by its envelope and never shared
//! across envelopes.

use std::any::Any;
use std::sync::Arc;

/// Opaque captured context, applied only while its envelope executes.
#[derive(Clone)]
pub struct ContextSnapshot(Arc<dyn Any + Send + Sync>);

impl ContextSnapshot {
    /// Wraps an arbitrary captured value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// An empty snapshot (used by propagators with nothing to carry).
    pub fn empty() -> Self {
        Self::new(())
    }

    /// Downcasts the captured value back to its concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for ContextSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContextSnapshot(..)")
    }
}

/// Scoped-acquisition token returned by [`ContextPropagator::apply`].
///
/// Dropping the guard resets the ambient context. The executor holds the
/// guard only between the envelope entering `Starting` and leaving
/// `Running`.
pub struct ContextGuard {
    reset: Option<Box<dyn FnOnce() + Send>>,
}

impl ContextGuard {
    /// Creates a guard that runs `reset` exactly once on drop.
    pub fn new(reset: impl FnOnce() + Send + 'static) -> Self {
        Self {
            reset: Some(Box::new(reset)),
        }
    }

    /// A guard with no reset action.
    pub fn noop() -> Self {
        Self { reset: None }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.take() {
            reset();
        }
    }
}

/// Capture/apply/reset capability consumed by the executor.
///
/// `capture` is called on the submitting execution unit; `apply` and the
/// guard drop happen on the envelope's worker. Implementations must be safe
/// under that split.
pub trait ContextPropagator: Send + Sync + 'static {
    /// Snapshots the ambient context of the calling execution unit.
    fn capture(&self) -> ContextSnapshot;

    /// Establishes `snapshot` as the ambient context of the current
    /// execution unit; the returned guard undoes it on drop.
    fn apply(&self, snapshot: &ContextSnapshot) -> ContextGuard;
}

/// Propagator that carries no context. The builder default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPropagator;

impl ContextPropagator for NoopPropagator {
    fn capture(&self) -> ContextSnapshot {
        ContextSnapshot::empty()
    }

    fn apply(&self, _snapshot: &ContextSnapshot) -> ContextGuard {
        ContextGuard::noop()
    }
}
