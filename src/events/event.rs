//! # Events emitted by the executor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: envelope execution flow (submitted, starting,
//!   running, done, failed, aborted, rejected)
//! - **Advisory events**: hung-task reports from the background monitor
//! - **Executor events**: shutdown requests and termination
//!
//! The [`Event`] struct carries metadata such as timestamps, task identity,
//! reasons, and elapsed runtimes.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of executor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Envelope lifecycle events ===
    /// A submission was accepted and an envelope created.
    ///
    /// Sets: `task`, `id`, `at`, `seq`
    TaskSubmitted,

    /// An envelope took a concurrency slot and is about to run.
    ///
    /// Sets: `task`, `id`, `at`, `seq`
    TaskStarting,

    /// A payload has begun executing on its worker.
    ///
    /// Sets: `task`, `id`, `at`, `seq`
    TaskRunning,

    /// An envelope completed successfully.
    ///
    /// Sets: `task`, `id`, `elapsed_ms`, `at`, `seq`
    TaskDone,

    /// A payload raised an error; the envelope is `Failed`.
    ///
    /// Sets: `task`, `id`, `reason`, `elapsed_ms`, `at`, `seq`
    TaskFailed,

    /// An envelope was cancelled — from the queue or via interruption.
    ///
    /// Sets: `task`, `id`, `at`, `seq`
    TaskAborted,

    /// A submission was refused under the `Abort` rejection policy.
    ///
    /// Sets: `task`, `reason`, `at`, `seq`
    TaskRejected,

    // === Advisory events ===
    /// The monitor observed a running envelope past the hung threshold.
    /// Published once per envelope; purely advisory.
    ///
    /// Sets: `task`, `id`, `elapsed_ms`, `at`, `seq`
    TaskHung,

    // === Executor events ===
    /// `shutdown()` was called; queued and running work will drain.
    ///
    /// Sets: `at`, `seq`
    ShutdownRequested,

    /// `shutdown_now()` was called; queued work was cancelled and running
    /// workers were signaled.
    ///
    /// Sets: `at`, `seq`
    ShutdownForced,

    /// The last envelope reached a terminal state after shutdown; the
    /// executor is terminated.
    ///
    /// Sets: `at`, `seq`
    Terminated,

    // === Subscriber events ===
    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`, `at`, `seq`
    SubscriberOverflow,

    /// A subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason`, `at`, `seq`
    SubscriberPanicked,
}

/// Executor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Envelope id, if applicable.
    pub id: Option<TaskId>,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, ...).
    pub reason: Option<Arc<str>>,
    /// Elapsed runtime in milliseconds (compact).
    pub elapsed_ms: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            id: None,
            task: None,
            reason: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a task (or subscriber) name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches an envelope id.
    #[inline]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an elapsed runtime (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: std::time::Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}
