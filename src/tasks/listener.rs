//! # Per-task lifecycle listener.
//!
//! A [`TaskListener`] is bound to a single submission and receives that
//! envelope's lifecycle transitions in strict order:
//!
//! ```text
//! on_submitted → on_starting → on_running → on_done
//!             └─(cancelled before start)──► on_aborted → on_done
//!             └─(interrupted while running: on_starting → on_running →)
//!                                           on_aborted → on_done
//! ```
//!
//! ## Contract
//! - `on_submitted` fires from the submission path before any worker-side
//!   callback; every later callback fires on the envelope's own worker.
//! - Implementations must tolerate being invoked on an unspecified
//!   execution unit and must not assume ordering relative to other
//!   envelopes.
//! - A slow listener delays only its own envelope's bookkeeping.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::TaskId;
use crate::error::TaskError;

/// Shared handle to a listener.
pub type ListenerRef = Arc<dyn TaskListener>;

/// Identity of the envelope a callback refers to.
#[derive(Clone, Debug)]
pub struct TaskInfo {
    /// Unique envelope id.
    pub id: TaskId,
    /// Task name as reported by the payload.
    pub name: Arc<str>,
}

/// Lifecycle notification capability bound to one submission.
///
/// All methods default to no-ops; implement only the events you care about.
#[async_trait]
pub trait TaskListener: Send + Sync + 'static {
    /// The submission was accepted and an envelope exists.
    async fn on_submitted(&self, _task: &TaskInfo) {}

    /// The envelope took a concurrency slot and is about to run.
    async fn on_starting(&self, _task: &TaskInfo) {}

    /// The payload has begun executing.
    async fn on_running(&self, _task: &TaskInfo) {}

    /// The envelope was cancelled — before starting, or while running via
    /// cooperative interruption.
    async fn on_aborted(&self, _task: &TaskInfo) {}

    /// Terminal callback; always the last event for an envelope. `outcome`
    /// carries the payload error, if any.
    async fn on_done(&self, _task: &TaskInfo, _outcome: &Result<(), TaskError>) {}
}
