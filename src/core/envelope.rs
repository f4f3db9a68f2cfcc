//! # Task envelope: per-submission state machine.
//!
//! A [`TaskEnvelope`] wraps one accepted submission with lifecycle state,
//! timestamps, the captured context snapshot, and the optional listener
//! binding. State transitions are published through a `watch` channel so any
//! number of [`TaskHandle`]s can await the terminal state without polling.
//!
//! ## State machine
//! ```text
//! Submitted ──► Queued ──► Starting ──► Running ──► Successful
//!                 │                        │    └──► Failed
//!                 └────────► Aborted ◄─────┘
//! ```
//!
//! ## Rules
//! - Terminal states (`Successful`, `Failed`, `Aborted`) are never
//!   re-entered; an illegal transition is a programming invariant violation
//!   (`debug_assert!` + error log), never retried.
//! - The outcome is recorded before the terminal transition becomes
//!   observable, so a handle that sees a terminal state can always read it.
//! - The arming gate orders the worker's first listener signal after
//!   `on_submitted` has completed on the submitting side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::context::ContextSnapshot;
use crate::error::TaskError;
use crate::tasks::{ListenerRef, TaskInfo, TaskRef};

/// Unique envelope identity.
pub type TaskId = u64;

/// Process-wide envelope id counter.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Accepted; not yet placed.
    Submitted,
    /// Waiting for a concurrency slot (possibly transiently).
    Queued,
    /// Slot taken; about to run.
    Starting,
    /// Payload executing.
    Running,
    /// Payload returned `Ok`.
    Successful,
    /// Payload raised an error.
    Failed,
    /// Cancelled before start, or interruption honored while running.
    Aborted,
}

impl TaskState {
    /// True for `Successful`, `Failed`, and `Aborted`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Successful | TaskState::Failed | TaskState::Aborted
        )
    }

    fn can_advance_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Submitted, TaskState::Queued)
                | (TaskState::Queued, TaskState::Starting)
                | (TaskState::Queued, TaskState::Aborted)
                | (TaskState::Starting, TaskState::Running)
                | (TaskState::Running, TaskState::Successful)
                | (TaskState::Running, TaskState::Failed)
                | (TaskState::Running, TaskState::Aborted)
        )
    }
}

/// One accepted submission: payload, listener, captured context, timestamps,
/// and lifecycle state.
pub(crate) struct TaskEnvelope {
    id: TaskId,
    name: Arc<str>,
    task: TaskRef,
    listener: Option<ListenerRef>,
    context: ContextSnapshot,
    cancel: CancellationToken,
    submitted_at: Instant,
    started_at: OnceLock<Instant>,
    completed_at: OnceLock<Instant>,
    outcome: OnceLock<Result<(), TaskError>>,
    state_tx: watch::Sender<TaskState>,
    armed_tx: watch::Sender<bool>,
}

impl TaskEnvelope {
    /// Creates a fresh envelope in `Submitted`.
    pub(crate) fn new(
        task: TaskRef,
        listener: Option<ListenerRef>,
        context: ContextSnapshot,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(TaskState::Submitted);
        let (armed_tx, _) = watch::channel(false);
        Arc::new(Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(task.name()),
            task,
            listener,
            context,
            cancel: CancellationToken::new(),
            submitted_at: Instant::now(),
            started_at: OnceLock::new(),
            completed_at: OnceLock::new(),
            outcome: OnceLock::new(),
            state_tx,
            armed_tx,
        })
    }

    #[inline]
    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    #[inline]
    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub(crate) fn task_ref(&self) -> TaskRef {
        Arc::clone(&self.task)
    }

    #[inline]
    pub(crate) fn listener(&self) -> Option<&ListenerRef> {
        self.listener.as_ref()
    }

    #[inline]
    pub(crate) fn context(&self) -> &ContextSnapshot {
        &self.context
    }

    #[inline]
    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Identity passed to listener callbacks.
    pub(crate) fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            name: Arc::clone(&self.name),
        }
    }

    /// Current lifecycle state.
    pub(crate) fn state(&self) -> TaskState {
        *self.state_tx.borrow()
    }

    /// Subscribes to state transitions.
    pub(crate) fn state_watch(&self) -> watch::Receiver<TaskState> {
        self.state_tx.subscribe()
    }

    /// Advances the state machine, enforcing legal transitions.
    pub(crate) fn advance(&self, next: TaskState) {
        let prev = *self.state_tx.borrow();
        if !prev.can_advance_to(next) {
            debug_assert!(
                false,
                "illegal transition {prev:?} -> {next:?} for task {}",
                self.id
            );
            tracing::error!(
                task = %self.name,
                id = self.id,
                ?prev,
                ?next,
                "illegal envelope state transition"
            );
            return;
        }
        self.state_tx.send_replace(next);
    }

    /// Opens the arming gate: `on_submitted` has completed.
    pub(crate) fn arm(&self) {
        self.armed_tx.send_replace(true);
    }

    /// Waits for the arming gate (no-op once open).
    pub(crate) async fn armed(&self) {
        let mut rx = self.armed_tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Records the dispatch timestamp (first call wins).
    pub(crate) fn mark_started(&self) {
        let _ = self.started_at.set(Instant::now());
    }

    #[inline]
    pub(crate) fn started_at(&self) -> Option<Instant> {
        self.started_at.get().copied()
    }

    #[inline]
    pub(crate) fn completed_at(&self) -> Option<Instant> {
        self.completed_at.get().copied()
    }

    /// Records the completion timestamp (first call wins).
    pub(crate) fn mark_completed(&self) {
        let _ = self.completed_at.set(Instant::now());
    }

    /// Wall time between submission and now.
    #[allow(dead_code)]
    pub(crate) fn age(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Runtime so far, or total runtime once completed. `None` before
    /// dispatch.
    pub(crate) fn elapsed(&self) -> Option<Duration> {
        let start = self.started_at()?;
        let end = self.completed_at().unwrap_or_else(Instant::now);
        Some(end.duration_since(start))
    }

    /// Records the terminal outcome. Double completion is an invariant
    /// violation.
    pub(crate) fn set_outcome(&self, outcome: Result<(), TaskError>) {
        if self.outcome.set(outcome).is_err() {
            debug_assert!(false, "outcome recorded twice for task {}", self.id);
            tracing::error!(task = %self.name, id = self.id, "outcome recorded twice");
        }
    }

    /// The recorded outcome, if the envelope is terminal.
    pub(crate) fn outcome(&self) -> Option<Result<(), TaskError>> {
        self.outcome.get().cloned()
    }

    /// Forces an `Aborted` terminal state from any point in the lifecycle.
    ///
    /// Only for a worker future dropped mid-execution, which cannot finish
    /// its normal bookkeeping; bypasses the transition legality check.
    pub(crate) fn force_abort(&self) {
        if self.outcome.get().is_none() {
            let _ = self.outcome.set(Err(TaskError::Canceled));
        }
        let _ = self.completed_at.set(Instant::now());
        if !self.state().is_terminal() {
            self.state_tx.send_replace(TaskState::Aborted);
        }
    }
}

/// Caller-facing view of one submission.
///
/// Cheap to clone; every clone observes the same envelope. Waiting never
/// holds executor locks.
#[derive(Clone)]
pub struct TaskHandle {
    env: Arc<TaskEnvelope>,
    rx: watch::Receiver<TaskState>,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.env.id())
            .field("name", &self.env.name())
            .field("state", &self.env.state())
            .finish()
    }
}

impl TaskHandle {
    pub(crate) fn new(env: Arc<TaskEnvelope>) -> Self {
        let rx = env.state_watch();
        Self { env, rx }
    }

    /// Unique envelope id.
    pub fn id(&self) -> TaskId {
        self.env.id()
    }

    /// Task name as reported by the payload.
    pub fn name(&self) -> &str {
        self.env.name()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.env.state()
    }

    /// True once the envelope reached any terminal state.
    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// True if the envelope was cancelled (before start or by honored
    /// interruption).
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Aborted
    }

    /// Waits for the terminal state and returns it.
    pub async fn wait(&mut self) -> TaskState {
        loop {
            let state = *self.rx.borrow_and_update();
            if state.is_terminal() {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return *self.rx.borrow();
            }
        }
    }

    /// Waits for completion and returns the payload outcome.
    ///
    /// An aborted envelope yields [`TaskError::Canceled`].
    pub async fn result(&mut self) -> Result<(), TaskError> {
        let state = self.wait().await;
        match self.env.outcome() {
            Some(outcome) => outcome,
            // outcome is recorded before the terminal transition; this arm
            // only guards against an envelope whose watch sender vanished
            None => match state {
                TaskState::Aborted => Err(TaskError::Canceled),
                TaskState::Failed => Err(TaskError::fail("unknown failure")),
                _ => Ok(()),
            },
        }
    }
}
