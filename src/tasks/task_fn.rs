//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per execution. No hidden shared state; if the closure needs
//! shared state, capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use taskwarden::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::arc("cleanup", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(TaskError::Canceled);
//!     }
//!     // do work...
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(t.name(), "cleanup");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::Task;

/// Closure-backed task implementation.
///
/// Wraps a closure that *creates* a new future per execution.
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle (`Arc<dyn Task>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_task_fn_runs_closure() {
        let t = TaskFn::arc("ok", |_ctx: CancellationToken| async {
            Ok::<(), TaskError>(())
        });
        assert_eq!(t.name(), "ok");
        assert!(t.run(CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_task_fn_propagates_error() {
        let t = TaskFn::arc("bad", |_ctx: CancellationToken| async {
            Err::<(), TaskError>(TaskError::fail("boom"))
        });
        let err = t.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "task_failed");
    }
}
