//! # LogWriter — event logging subscriber
//!
//! A minimal subscriber that forwards executor events to `tracing`.
//!
//! ## Example output
//! ```text
//! INFO task submitted task="backfill" id=3
//! INFO task running task="backfill" id=3
//! WARN task hung task="backfill" id=3 elapsed_ms=61000
//! INFO task done task="backfill" id=3 elapsed_ms=74000
//! INFO executor terminated
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event logging subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::TaskSubmitted => {
                tracing::debug!(task, id = e.id, "task submitted");
            }
            EventKind::TaskStarting => {
                tracing::debug!(task, id = e.id, "task starting");
            }
            EventKind::TaskRunning => {
                tracing::info!(task, id = e.id, "task running");
            }
            EventKind::TaskDone => {
                tracing::info!(task, id = e.id, elapsed_ms = e.elapsed_ms, "task done");
            }
            EventKind::TaskFailed => {
                tracing::warn!(
                    task,
                    id = e.id,
                    reason = e.reason.as_deref(),
                    elapsed_ms = e.elapsed_ms,
                    "task failed"
                );
            }
            EventKind::TaskAborted => {
                tracing::info!(task, id = e.id, "task aborted");
            }
            EventKind::TaskRejected => {
                tracing::warn!(task, reason = e.reason.as_deref(), "task rejected");
            }
            EventKind::TaskHung => {
                tracing::warn!(task, id = e.id, elapsed_ms = e.elapsed_ms, "task hung");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("executor shutdown requested");
            }
            EventKind::ShutdownForced => {
                tracing::info!("executor shutdown forced");
            }
            EventKind::Terminated => {
                tracing::info!("executor terminated");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(
                    subscriber = task,
                    reason = e.reason.as_deref(),
                    "subscriber overflow"
                );
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(
                    subscriber = task,
                    reason = e.reason.as_deref(),
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
