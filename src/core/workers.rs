//! # Worker lifecycle: the factory port and worker records.
//!
//! One disposable execution unit is created per dispatched envelope and
//! discarded once the envelope reaches a terminal state; units are never
//! pooled or reused. The [`WorkerFactory`] capability isolates the core from
//! the spawning primitive; [`TokioWorkerFactory`] is the default.
//!
//! The executor tracks the live set itself (the factory is not asked to
//! introspect): live workers correspond 1:1 to envelopes in
//! `Starting`/`Running`. Completed workers may leave a [`WorkerInfo`] record
//! behind for the configured retention window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use super::envelope::{TaskEnvelope, TaskId};

/// Produces one live execution unit per call.
///
/// ## Contract
/// - Every call yields a **fresh** unit; no reuse across calls.
/// - The returned handle may be dropped by the core; the unit keeps running
///   detached until its work completes.
pub trait WorkerFactory: Send + Sync + 'static {
    /// Spawns `work` on a new execution unit.
    fn spawn(&self, work: BoxFuture<'static, ()>) -> JoinHandle<()>;
}

/// Default factory backed by `tokio::spawn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioWorkerFactory;

impl WorkerFactory for TokioWorkerFactory {
    fn spawn(&self, work: BoxFuture<'static, ()>) -> JoinHandle<()> {
        tokio::spawn(work)
    }
}

/// Introspection record for a live or retired worker.
#[derive(Clone, Debug)]
pub struct WorkerInfo {
    /// Envelope the worker is (was) bound to.
    pub task_id: TaskId,
    /// Task name as reported by the payload.
    pub task_name: Arc<str>,
    /// Dispatch timestamp; `None` if the worker never started its envelope.
    pub started_at: Option<Instant>,
    /// Completion timestamp; `None` while live.
    pub completed_at: Option<Instant>,
}

impl WorkerInfo {
    /// Snapshot of an envelope's worker bookkeeping.
    pub(crate) fn of(env: &TaskEnvelope) -> Self {
        Self {
            task_id: env.id(),
            task_name: Arc::clone(env.name()),
            started_at: env.started_at(),
            completed_at: env.completed_at(),
        }
    }

    /// Runtime so far (live) or total runtime (retired). Zero before
    /// dispatch.
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(start) => self
                .completed_at
                .unwrap_or_else(Instant::now)
                .duration_since(start),
            None => Duration::ZERO,
        }
    }
}

/// Completed worker record kept for the retention window.
pub(crate) struct RetiredWorker {
    pub(crate) info: WorkerInfo,
    pub(crate) purge_at: Instant,
}
