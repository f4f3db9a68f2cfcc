#![allow(dead_code)]

//! Shared fixtures for integration tests: a controllable blocking payload,
//! a listener that records callback order, and a polling helper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use taskwarden::{
    ExecutorConfig, TaskError, TaskFn, TaskInfo, TaskListener, TaskRef,
};

/// Payload that blocks until released or interrupted.
pub struct Blocker {
    release: Notify,
    started: AtomicBool,
    interrupted: AtomicBool,
}

impl Blocker {
    fn new() -> Self {
        Self {
            release: Notify::new(),
            started: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
        }
    }

    /// Lets the payload finish successfully.
    pub fn stop_blocking(&self) {
        self.release.notify_one();
    }

    /// True once the payload began executing.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// True once the payload observed the interruption signal.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Builds a blocking task and the knob controlling it.
pub fn blocking_task(name: &'static str) -> (TaskRef, Arc<Blocker>) {
    let blocker = Arc::new(Blocker::new());
    let b = Arc::clone(&blocker);
    let task: TaskRef = TaskFn::arc(name, move |ctx: CancellationToken| {
        let b = Arc::clone(&b);
        async move {
            b.started.store(true, Ordering::SeqCst);
            tokio::select! {
                _ = b.release.notified() => Ok(()),
                _ = ctx.cancelled() => {
                    b.interrupted.store(true, Ordering::SeqCst);
                    Err(TaskError::Canceled)
                }
            }
        }
    });
    (task, blocker)
}

/// Task that completes immediately.
pub fn quick_task(name: &'static str) -> TaskRef {
    TaskFn::arc(name, |_ctx: CancellationToken| async {
        Ok::<(), TaskError>(())
    })
}

/// Task that fails immediately with the given message.
pub fn failing_task(name: &'static str, message: &'static str) -> TaskRef {
    TaskFn::arc(name, move |_ctx: CancellationToken| async move {
        Err::<(), TaskError>(TaskError::fail(message))
    })
}

/// Task that appends its name to a shared log when it runs.
pub fn recording_task(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> TaskRef {
    TaskFn::arc(name, move |_ctx: CancellationToken| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(name);
            Ok::<(), TaskError>(())
        }
    })
}

/// Listener recording callback order.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingListener {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn saw(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| *e == event)
    }

    fn push(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl TaskListener for RecordingListener {
    async fn on_submitted(&self, _task: &TaskInfo) {
        self.push("submitted");
    }
    async fn on_starting(&self, _task: &TaskInfo) {
        self.push("starting");
    }
    async fn on_running(&self, _task: &TaskInfo) {
        self.push("running");
    }
    async fn on_aborted(&self, _task: &TaskInfo) {
        self.push("aborted");
    }
    async fn on_done(&self, _task: &TaskInfo, _outcome: &Result<(), TaskError>) {
        self.push("done");
    }
}

/// Polls `cond` until it holds or `timeout` elapses.
pub async fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Default polling timeout generous enough for CI.
pub const WAIT: Duration = Duration::from_secs(5);

/// Config with the given capacity limits and test defaults elsewhere.
pub fn capacity_cfg(max_parallel: usize, queue_capacity: usize) -> ExecutorConfig {
    ExecutorConfig {
        max_parallel_tasks: max_parallel,
        queue_capacity,
        ..ExecutorConfig::named("test-executor")
    }
}
