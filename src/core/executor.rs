//! # ManagedExecutor: admission, slot accounting, and shutdown.
//!
//! The [`ManagedExecutor`] owns the pending queue, the running set, the
//! executor lifecycle state, and the task counters. Admission decisions,
//! dispatch, release-and-dispatch, and shutdown transitions are all decided
//! inside one mutex so they are linearizable with respect to each other; the
//! critical sections are short and never await.
//!
//! ## Data flow
//! ```text
//! submit ──► admit (one lock: state + slots + queue + policy)
//!               ├─ slot free ──► reserve slot ──► worker runs envelope
//!               ├─ queue room ─► enqueue (FIFO)
//!               └─ exhausted ──► RejectPolicy
//!
//! worker finishes ──► complete (same lock):
//!               ├─ release slot, retire worker record
//!               ├─ pull queue head into the freed slot
//!               └─ evaluate Terminated transition
//! ```
//!
//! ## Rules
//! - `count(Starting ∪ Running) ≤ max_parallel_tasks` at all times.
//! - Queue order is admission order is dispatch order (strict FIFO).
//! - Cancellation of queued work is synchronous and unconditional;
//!   cancellation of running work is an advisory token signal.
//! - `await_termination` never holds the lock across its wait.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ExecutorConfig;
use crate::context::{ContextPropagator, ContextSnapshot};
use crate::error::{SubmitError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::RejectPolicy;
use crate::tasks::{ListenerRef, TaskRef};

use super::builder::ExecutorBuilder;
use super::dispatch;
use super::envelope::{TaskEnvelope, TaskHandle, TaskId, TaskState};
use super::monitor;
use super::state::ExecutorState;
use super::workers::{RetiredWorker, WorkerFactory, WorkerInfo};

/// State guarded by the executor's single logical lock.
struct Core {
    state: ExecutorState,
    queue: VecDeque<Arc<TaskEnvelope>>,
    running: HashMap<TaskId, Arc<TaskEnvelope>>,
    retired: Vec<RetiredWorker>,
}

/// Outcome of an admission decision, made atomically under the core lock.
enum Admitted {
    /// Slot reserved; dispatch to a fresh worker.
    Dispatch(Arc<TaskEnvelope>),
    /// Queued in FIFO order.
    Queue(Arc<TaskEnvelope>),
    /// `RejectPolicy::Run`: execute inline on the submitting unit.
    RunInline(Arc<TaskEnvelope>),
    /// `RejectPolicy::Discard`: admitted, aborted immediately.
    Discard(Arc<TaskEnvelope>),
    /// `RejectPolicy::DiscardOldest`: newcomer queued, queue head aborted.
    DiscardOldest {
        env: Arc<TaskEnvelope>,
        victim: Arc<TaskEnvelope>,
    },
}

impl Admitted {
    fn envelope(&self) -> &Arc<TaskEnvelope> {
        match self {
            Admitted::Dispatch(env)
            | Admitted::Queue(env)
            | Admitted::RunInline(env)
            | Admitted::Discard(env) => env,
            Admitted::DiscardOldest { env, .. } => env,
        }
    }
}

/// Managed bounded-concurrency task executor.
///
/// Build one with [`ManagedExecutor::builder`]; all construction happens
/// inside a Tokio runtime (the builder spawns the event forwarder and the
/// background monitor).
pub struct ManagedExecutor {
    cfg: ExecutorConfig,
    bus: Bus,
    propagator: Arc<dyn ContextPropagator>,
    factory: Arc<dyn WorkerFactory>,
    core: Mutex<Core>,
    state_tx: watch::Sender<ExecutorState>,
    runtime_token: CancellationToken,
    submitted: AtomicU64,
    completed: AtomicU64,
}

impl ManagedExecutor {
    /// Starts building an executor with the given configuration.
    pub fn builder(cfg: ExecutorConfig) -> ExecutorBuilder {
        ExecutorBuilder::new(cfg)
    }

    /// Builds an executor with library defaults (no subscribers, no context
    /// propagation, `tokio::spawn` workers).
    pub fn new(cfg: ExecutorConfig) -> Arc<Self> {
        ExecutorBuilder::new(cfg).build()
    }

    pub(crate) fn from_parts(
        cfg: ExecutorConfig,
        bus: Bus,
        propagator: Arc<dyn ContextPropagator>,
        factory: Arc<dyn WorkerFactory>,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(ExecutorState::New);
        Arc::new(Self {
            cfg,
            bus,
            propagator,
            factory,
            core: Mutex::new(Core {
                state: ExecutorState::New,
                queue: VecDeque::new(),
                running: HashMap::new(),
                retired: Vec::new(),
            }),
            state_tx,
            runtime_token: CancellationToken::new(),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        })
    }

    /// `New → Accepting`; spawns the background monitor. Builder-only.
    pub(crate) fn start(self: &Arc<Self>) {
        {
            let mut core = self.core.lock().unwrap();
            debug_assert!(matches!(core.state, ExecutorState::New));
            core.state = ExecutorState::Accepting;
            self.state_tx.send_replace(ExecutorState::Accepting);
        }
        if self.cfg.hung_detection().is_some() || self.cfg.retention().is_some() {
            monitor::spawn_monitor(self);
        }
        tracing::debug!(executor = %self.cfg.name, "executor accepting");
    }

    /// Executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.cfg
    }

    /// Executor name (diagnostics identity).
    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    pub(crate) fn propagator(&self) -> &Arc<dyn ContextPropagator> {
        &self.propagator
    }

    pub(crate) fn runtime_token(&self) -> &CancellationToken {
        &self.runtime_token
    }

    // ---------------------------
    // Submission
    // ---------------------------

    /// Submits a task without a listener. See [`ManagedExecutor::submit_with`].
    pub async fn submit(self: &Arc<Self>, task: TaskRef) -> Result<TaskHandle, SubmitError> {
        self.submit_with(task, None).await
    }

    /// Submits a task with an optional lifecycle listener.
    ///
    /// The ambient context is captured on the calling execution unit before
    /// admission. On success the envelope is counted, `on_submitted` is
    /// signaled, and the returned handle observes every later transition.
    ///
    /// The `await` is consumed only by the [`RejectPolicy::Run`]
    /// (caller-runs) overflow path; admission itself is a synchronous
    /// critical section and listener signaling is detached.
    ///
    /// # Errors
    /// - [`SubmitError::Shutdown`] if the executor is past `Accepting`.
    /// - [`SubmitError::QueueFull`] if capacity is exhausted under
    ///   [`RejectPolicy::Abort`].
    ///
    /// [`RejectPolicy::Run`]: crate::RejectPolicy::Run
    /// [`RejectPolicy::Abort`]: crate::RejectPolicy::Abort
    pub async fn submit_with(
        self: &Arc<Self>,
        task: TaskRef,
        listener: Option<ListenerRef>,
    ) -> Result<TaskHandle, SubmitError> {
        let context = self.propagator.capture();
        let admitted = match self.admit(&task, listener, context) {
            Ok(admitted) => admitted,
            Err(err) => {
                self.bus.publish(
                    Event::now(EventKind::TaskRejected)
                        .with_task(task.name().to_string())
                        .with_reason(err.as_label()),
                );
                tracing::debug!(
                    executor = %self.cfg.name,
                    task = task.name(),
                    reason = err.as_label(),
                    "submission rejected"
                );
                return Err(err);
            }
        };

        let env = Arc::clone(admitted.envelope());
        self.bus.publish(
            Event::now(EventKind::TaskSubmitted)
                .with_task(Arc::clone(env.name()))
                .with_id(env.id()),
        );
        // every worker-side signal waits on the arming gate, so the
        // per-envelope order submitted → starting → ... always holds
        dispatch::spawn_submit_signal(Arc::clone(&env));

        let handle = TaskHandle::new(Arc::clone(&env));
        match admitted {
            Admitted::Dispatch(env) => self.dispatch(env),
            Admitted::Queue(_) => {}
            Admitted::RunInline(env) => {
                dispatch::run_envelope(Arc::clone(self), env).await;
            }
            Admitted::Discard(env) => self.abort_unstarted(&env),
            Admitted::DiscardOldest { victim, .. } => self.abort_unstarted(&victim),
        }
        Ok(handle)
    }

    /// Admission decision: one critical section over state, slots, queue
    /// depth, and the rejection policy.
    fn admit(
        &self,
        task: &TaskRef,
        listener: Option<ListenerRef>,
        context: ContextSnapshot,
    ) -> Result<Admitted, SubmitError> {
        let mut core = self.core.lock().unwrap();
        if !core.state.is_accepting() {
            return Err(SubmitError::Shutdown);
        }

        if core.running.len() < self.cfg.max_parallel() {
            let env = self.make_envelope(task, listener, context);
            env.advance(TaskState::Queued);
            core.running.insert(env.id(), Arc::clone(&env));
            return Ok(Admitted::Dispatch(env));
        }

        let queue_room = self
            .cfg
            .queue_limit()
            .map_or(true, |cap| core.queue.len() < cap);
        if queue_room {
            let env = self.make_envelope(task, listener, context);
            env.advance(TaskState::Queued);
            core.queue.push_back(Arc::clone(&env));
            return Ok(Admitted::Queue(env));
        }

        match self.cfg.reject_policy {
            RejectPolicy::Abort => Err(SubmitError::QueueFull),
            RejectPolicy::DiscardOldest => {
                // with a zero-capacity queue there is no oldest to discard
                let Some(victim) = core.queue.pop_front() else {
                    return Err(SubmitError::QueueFull);
                };
                let env = self.make_envelope(task, listener, context);
                env.advance(TaskState::Queued);
                core.queue.push_back(Arc::clone(&env));
                Ok(Admitted::DiscardOldest { env, victim })
            }
            RejectPolicy::Discard => {
                let env = self.make_envelope(task, listener, context);
                env.advance(TaskState::Queued);
                Ok(Admitted::Discard(env))
            }
            RejectPolicy::Run => {
                let env = self.make_envelope(task, listener, context);
                env.advance(TaskState::Queued);
                Ok(Admitted::RunInline(env))
            }
        }
    }

    /// Creates an envelope and counts the accepted submission.
    fn make_envelope(
        &self,
        task: &TaskRef,
        listener: Option<ListenerRef>,
        context: ContextSnapshot,
    ) -> Arc<TaskEnvelope> {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        TaskEnvelope::new(Arc::clone(task), listener, context)
    }

    /// Spawns a fresh worker for a slot-holding envelope.
    fn dispatch(self: &Arc<Self>, env: Arc<TaskEnvelope>) {
        let work = dispatch::run_envelope(Arc::clone(self), env);
        let _ = self.factory.spawn(Box::pin(work));
    }

    /// Aborts an envelope that never started (policy overflow paths).
    fn abort_unstarted(&self, env: &Arc<TaskEnvelope>) {
        env.set_outcome(Err(TaskError::Canceled));
        env.mark_completed();
        env.advance(TaskState::Aborted);
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.bus.publish(
            Event::now(EventKind::TaskAborted)
                .with_task(Arc::clone(env.name()))
                .with_id(env.id()),
        );
        dispatch::spawn_abort_signals(Arc::clone(env));
    }

    /// Terminal bookkeeping for an envelope that held (or bypassed) a slot:
    /// release the slot, retire the worker record, count completion, pull
    /// the next queued envelope into the freed slot, and evaluate the
    /// `Terminated` transition — one critical section.
    pub(crate) fn complete(self: &Arc<Self>, env: &Arc<TaskEnvelope>) {
        let mut next = None;
        let terminated;
        {
            let mut core = self.core.lock().unwrap();
            if core.running.remove(&env.id()).is_some() {
                if let Some(window) = self.cfg.retention() {
                    core.retired.push(RetiredWorker {
                        info: WorkerInfo::of(env),
                        purge_at: Instant::now() + window,
                    });
                }
            }
            self.completed.fetch_add(1, Ordering::Relaxed);

            if matches!(
                core.state,
                ExecutorState::Accepting | ExecutorState::ShuttingDown
            ) && core.running.len() < self.cfg.max_parallel()
            {
                if let Some(head) = core.queue.pop_front() {
                    core.running.insert(head.id(), Arc::clone(&head));
                    next = Some(head);
                }
            }

            terminated = self.maybe_terminate_locked(&mut core);
        }

        if terminated {
            self.bus.publish(Event::now(EventKind::Terminated));
        }
        if let Some(head) = next {
            self.dispatch(head);
        }
    }

    /// `ShuttingDown`/`Stopped` → `Terminated` once nothing is left.
    /// Must run under the core lock.
    fn maybe_terminate_locked(&self, core: &mut Core) -> bool {
        if core.state.is_shutdown()
            && !core.state.is_terminated()
            && core.running.is_empty()
            && core.queue.is_empty()
        {
            core.state = ExecutorState::Terminated;
            self.state_tx.send_replace(ExecutorState::Terminated);
            self.runtime_token.cancel();
            tracing::debug!(executor = %self.cfg.name, "executor terminated");
            true
        } else {
            false
        }
    }

    // ---------------------------
    // Shutdown coordinator
    // ---------------------------

    /// Stops admitting new work; queued and running envelopes drain
    /// normally. Idempotent.
    pub fn shutdown(&self) {
        let terminated;
        {
            let mut core = self.core.lock().unwrap();
            if core.state.is_shutdown() {
                return;
            }
            core.state = ExecutorState::ShuttingDown;
            self.state_tx.send_replace(ExecutorState::ShuttingDown);
            terminated = self.maybe_terminate_locked(&mut core);
        }
        self.bus.publish(Event::now(EventKind::ShutdownRequested));
        if terminated {
            self.bus.publish(Event::now(EventKind::Terminated));
        }
        tracing::debug!(executor = %self.cfg.name, "shutdown requested");
    }

    /// Stops admitting new work, cancels every queued envelope, and signals
    /// interruption to every live worker. Returns the payloads that were
    /// queued but never started.
    ///
    /// Returns immediately: running envelopes stop only when their payloads
    /// observe the cancellation token.
    pub fn shutdown_now(&self) -> Vec<TaskRef> {
        let drained: Vec<Arc<TaskEnvelope>>;
        let terminated;
        {
            let mut core = self.core.lock().unwrap();
            if matches!(
                core.state,
                ExecutorState::Stopped | ExecutorState::Terminated
            ) {
                return Vec::new();
            }
            core.state = ExecutorState::Stopped;
            self.state_tx.send_replace(ExecutorState::Stopped);

            drained = core.queue.drain(..).collect();
            for env in &drained {
                env.set_outcome(Err(TaskError::Canceled));
                env.mark_completed();
                env.advance(TaskState::Aborted);
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            for env in core.running.values() {
                env.cancel_token().cancel();
            }
            terminated = self.maybe_terminate_locked(&mut core);
        }

        self.bus.publish(Event::now(EventKind::ShutdownForced));
        for env in &drained {
            self.bus.publish(
                Event::now(EventKind::TaskAborted)
                    .with_task(Arc::clone(env.name()))
                    .with_id(env.id()),
            );
            dispatch::spawn_abort_signals(Arc::clone(env));
        }
        if terminated {
            self.bus.publish(Event::now(EventKind::Terminated));
        }
        tracing::debug!(
            executor = %self.cfg.name,
            cancelled = drained.len(),
            "shutdown forced"
        );
        drained.iter().map(|env| env.task_ref()).collect()
    }

    /// True once any shutdown variant has been initiated.
    pub fn is_shutdown(&self) -> bool {
        self.state().is_shutdown()
    }

    /// True once no envelope remains outside a terminal state after
    /// shutdown.
    pub fn is_terminated(&self) -> bool {
        self.state().is_terminated()
    }

    /// Blocks the calling task until the executor terminates or the timeout
    /// elapses; returns whether termination was reached.
    ///
    /// Never holds the executor lock across the wait; any number of tasks
    /// may wait concurrently.
    pub async fn await_termination(&self, timeout: Duration) -> bool {
        let mut rx = self.state_tx.subscribe();
        let reached = async {
            loop {
                if rx.borrow_and_update().is_terminated() {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        };
        tokio::time::timeout(timeout, reached).await.is_ok() && self.is_terminated()
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    /// Current executor lifecycle state.
    pub fn state(&self) -> ExecutorState {
        *self.state_tx.borrow()
    }

    /// Total accepted submissions (monotone).
    pub fn task_count(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Total envelopes that reached a terminal state (monotone).
    pub fn completed_task_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Snapshot of the live worker set; empty when nothing is starting or
    /// running.
    pub fn live_workers(&self) -> Vec<WorkerInfo> {
        let core = self.core.lock().unwrap();
        core.running.values().map(|env| WorkerInfo::of(env)).collect()
    }

    /// Snapshot of the current hung set; empty when detection is disabled,
    /// when long-running mode is on, or when nothing is hung.
    pub fn hung_tasks(&self) -> Vec<WorkerInfo> {
        let Some(threshold) = self.cfg.hung_detection() else {
            return Vec::new();
        };
        if self.cfg.long_running_tasks {
            return Vec::new();
        }
        let now = Instant::now();
        let core = self.core.lock().unwrap();
        core.running
            .values()
            .filter(|env| env.state() == TaskState::Running)
            .filter(|env| {
                env.started_at()
                    .is_some_and(|started| now.duration_since(started) > threshold)
            })
            .map(|env| WorkerInfo::of(env))
            .collect()
    }

    /// Metadata of completed workers still inside the retention window.
    pub fn retired_workers(&self) -> Vec<WorkerInfo> {
        let mut core = self.core.lock().unwrap();
        let now = Instant::now();
        core.retired.retain(|record| record.purge_at > now);
        core.retired.iter().map(|record| record.info.clone()).collect()
    }

    /// Drops retired worker records whose retention window elapsed.
    pub(crate) fn purge_retired(&self) {
        let mut core = self.core.lock().unwrap();
        let now = Instant::now();
        core.retired.retain(|record| record.purge_at > now);
    }
}

impl Drop for ManagedExecutor {
    fn drop(&mut self) {
        // stop the monitor promptly even without an explicit shutdown
        self.runtime_token.cancel();
    }
}
