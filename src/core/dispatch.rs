//! # Run one envelope on its worker.
//!
//! Executes a dispatched envelope through its full lifecycle, publishing
//! listener signals and bus events along the way.
//!
//! ## Flow
//! ```text
//! armed gate ─► Starting ─► apply context ─► Running ─► payload
//!                                                         │
//!      Ok ────────────► Successful ─► on_done ─► TaskDone │
//!      Err(Canceled) ─► Aborted ─► on_aborted ─► on_done ─► TaskAborted
//!      Err(other) ────► Failed ─► on_done ─► TaskFailed
//! ```
//!
//! ## Rules
//! - The context guard is dropped (reset) on **every** exit path before
//!   terminal bookkeeping.
//! - Payload panics are caught and recorded as failures; a panicking
//!   payload can never leak a concurrency slot.
//! - Exactly one terminal bus event is published per envelope.
//! - Listener signaling happens on this worker, after the submitting side
//!   opened the arming gate; a slow listener delays only this envelope.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::TaskError;
use crate::events::{Event, EventKind};

use super::envelope::{TaskEnvelope, TaskState};
use super::executor::ManagedExecutor;

/// Awaits a listener callback with panic isolation: a panicking listener
/// must not unwind the worker and leak its slot.
async fn shield<F: Future<Output = ()>>(fut: F) {
    if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
        tracing::error!(?panic, "task listener panicked");
    }
}

/// Releases an envelope's bookkeeping even if the surrounding worker future
/// is dropped mid-execution (a caller abandoning an inline caller-runs
/// submit). Disarmed on the normal completion path.
struct SlotGuard {
    exec: Arc<ManagedExecutor>,
    env: Arc<TaskEnvelope>,
    disarmed: bool,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        // dropped after the terminal transition → only bookkeeping is owed
        let was_terminal = self.env.state().is_terminal();
        self.env.force_abort();
        // the runtime may be tearing down; skip anything that could spawn
        if tokio::runtime::Handle::try_current().is_ok() {
            if !was_terminal {
                self.exec.bus().publish(
                    Event::now(EventKind::TaskAborted)
                        .with_task(Arc::clone(self.env.name()))
                        .with_id(self.env.id()),
                );
                spawn_abort_signals(Arc::clone(&self.env));
            }
            self.exec.complete(&self.env);
        }
    }
}

/// Runs a dispatched envelope to its terminal state and releases its slot.
pub(crate) async fn run_envelope(exec: Arc<ManagedExecutor>, env: Arc<TaskEnvelope>) {
    env.armed().await;
    if env.state().is_terminal() {
        // dispatched envelopes are completed only by this function
        debug_assert!(false, "dispatched envelope already terminal");
        tracing::error!(task = %env.name(), id = env.id(), "dispatched envelope already terminal");
        return;
    }

    let mut slot = SlotGuard {
        exec: Arc::clone(&exec),
        env: Arc::clone(&env),
        disarmed: false,
    };
    let info = env.info();

    env.advance(TaskState::Starting);
    env.mark_started();
    if let Some(listener) = env.listener() {
        shield(listener.on_starting(&info)).await;
    }
    exec.bus().publish(
        Event::now(EventKind::TaskStarting)
            .with_task(Arc::clone(&info.name))
            .with_id(info.id),
    );

    let guard = exec.propagator().apply(env.context());

    env.advance(TaskState::Running);
    if let Some(listener) = env.listener() {
        shield(listener.on_running(&info)).await;
    }
    exec.bus().publish(
        Event::now(EventKind::TaskRunning)
            .with_task(Arc::clone(&info.name))
            .with_id(info.id),
    );

    let token = env.cancel_token().clone();
    let task = env.task_ref();
    let outcome = match AssertUnwindSafe(task.run(token)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(TaskError::Fail {
            error: panic_message(panic),
        }),
    };

    drop(guard);

    env.set_outcome(outcome.clone());
    env.mark_completed();
    let elapsed = env.elapsed().unwrap_or_default();

    match &outcome {
        Ok(()) => {
            env.advance(TaskState::Successful);
            if let Some(listener) = env.listener() {
                shield(listener.on_done(&info, &outcome)).await;
            }
            exec.bus().publish(
                Event::now(EventKind::TaskDone)
                    .with_task(Arc::clone(&info.name))
                    .with_id(info.id)
                    .with_elapsed(elapsed),
            );
        }
        Err(TaskError::Canceled) => {
            env.advance(TaskState::Aborted);
            if let Some(listener) = env.listener() {
                shield(listener.on_aborted(&info)).await;
                shield(listener.on_done(&info, &outcome)).await;
            }
            exec.bus().publish(
                Event::now(EventKind::TaskAborted)
                    .with_task(Arc::clone(&info.name))
                    .with_id(info.id),
            );
        }
        Err(err) => {
            env.advance(TaskState::Failed);
            if let Some(listener) = env.listener() {
                shield(listener.on_done(&info, &outcome)).await;
            }
            exec.bus().publish(
                Event::now(EventKind::TaskFailed)
                    .with_task(Arc::clone(&info.name))
                    .with_id(info.id)
                    .with_reason(err.to_string())
                    .with_elapsed(elapsed),
            );
        }
    }

    exec.complete(&env);
    slot.disarmed = true;
}

/// Signals `on_submitted` and opens the arming gate from a detached task,
/// so a caller dropping its submit future can never wedge the worker that
/// waits on the gate.
pub(crate) fn spawn_submit_signal(env: Arc<TaskEnvelope>) {
    if env.listener().is_none() {
        env.arm();
        return;
    }
    tokio::spawn(async move {
        let info = env.info();
        if let Some(listener) = env.listener() {
            shield(listener.on_submitted(&info)).await;
        }
        env.arm();
    });
}

/// Signals `on_aborted`/`on_done` for an envelope cancelled before start.
///
/// Runs on its own task so queued-work cancellation never blocks the
/// caller; waits for the arming gate to preserve per-envelope signal order.
pub(crate) fn spawn_abort_signals(env: Arc<TaskEnvelope>) {
    if env.listener().is_none() {
        return;
    }
    tokio::spawn(async move {
        env.armed().await;
        let info = env.info();
        let outcome = env.outcome().unwrap_or(Err(TaskError::Canceled));
        if let Some(listener) = env.listener() {
            shield(listener.on_aborted(&info)).await;
            shield(listener.on_done(&info, &outcome)).await;
        }
    });
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("payload panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("payload panicked: {s}")
    } else {
        "payload panicked".to_string()
    }
}
