//! # Task trait.
//!
//! A [`Task`] is the unit of work accepted by the executor: an async,
//! cancellable payload with a stable name. The common handle type is
//! [`TaskRef`], an `Arc<dyn Task>` suitable for sharing across the runtime.
//!
//! The payload receives a [`CancellationToken`]; interruption (forced
//! shutdown) is cooperative — the payload should observe the token and
//! return [`TaskError::Canceled`] promptly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Shared handle to a task payload.
pub type TaskRef = Arc<dyn Task>;

/// Asynchronous, cancellable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use taskwarden::{Task, TaskError};
///
/// struct Reindex;
///
/// #[async_trait]
/// impl Task for Reindex {
///     fn name(&self) -> &str { "reindex" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes the payload until completion or cancellation.
    ///
    /// Implementations should check `ctx.is_cancelled()` at safe points and
    /// return [`TaskError::Canceled`] to honor a forced shutdown; the
    /// executor records that as an `Aborted` terminal state rather than a
    /// failure.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
