//! Lifecycle tests: shutdown protocol, concurrency limits, counters,
//! worker bookkeeping, hung detection, listener ordering, and context
//! propagation.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use taskwarden::{
    ContextGuard, ContextPropagator, ContextSnapshot, Event, EventKind, ExecutorConfig,
    ListenerRef, ManagedExecutor, Subscribe, TaskError, TaskFn, TaskState, QUEUE_UNBOUNDED,
};
use tokio_util::sync::CancellationToken;

use common::{
    blocking_task, capacity_cfg, failing_task, quick_task, wait_until, RecordingListener, WAIT,
};

#[tokio::test]
async fn shutdown_marks_executor_shut_down() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));
    assert!(!exec.is_shutdown());
    exec.shutdown();
    assert!(exec.is_shutdown());
}

#[tokio::test]
async fn shutdown_now_aborts_queued_and_interrupts_running() {
    let exec = ManagedExecutor::new(capacity_cfg(1, 2));

    let (task1, blocker1) = blocking_task("task1");
    let listener1 = RecordingListener::arc();
    let _h1 = exec
        .submit_with(task1, Some(listener1 as ListenerRef))
        .await
        .expect("task1 admitted");
    assert!(wait_until(|| blocker1.is_started(), WAIT).await);

    let (task2, _b2) = blocking_task("task2");
    let listener2 = RecordingListener::arc();
    let mut h2 = exec
        .submit_with(task2, Some(Arc::clone(&listener2) as ListenerRef))
        .await
        .expect("task2 admitted");

    let (task3, _b3) = blocking_task("task3");
    let listener3 = RecordingListener::arc();
    let mut h3 = exec
        .submit_with(task3, Some(Arc::clone(&listener3) as ListenerRef))
        .await
        .expect("task3 admitted");

    assert_eq!(h2.state(), TaskState::Queued);
    assert_eq!(h3.state(), TaskState::Queued);

    let cancelled = exec.shutdown_now();
    assert_eq!(cancelled.len(), 2, "both queued payloads returned");

    assert_eq!(h2.wait().await, TaskState::Aborted);
    assert!(h2.is_cancelled());
    assert_eq!(h3.wait().await, TaskState::Aborted);
    assert!(h3.is_cancelled());
    assert!(wait_until(|| listener2.saw("aborted"), WAIT).await);
    assert!(wait_until(|| listener3.saw("aborted"), WAIT).await);

    // the running task observes the interruption signal
    assert!(wait_until(|| blocker1.is_interrupted(), WAIT).await);
}

#[tokio::test]
async fn max_parallel_tasks_is_enforced() {
    let exec = ManagedExecutor::new(capacity_cfg(2, 2));

    let (task1, blocker1) = blocking_task("task1");
    let mut h1 = exec.submit(task1).await.expect("task1 admitted");
    let (task2, blocker2) = blocking_task("task2");
    let mut h2 = exec.submit(task2).await.expect("task2 admitted");

    assert!(wait_until(|| blocker1.is_started(), WAIT).await);
    assert!(wait_until(|| blocker2.is_started(), WAIT).await);

    let listener3 = RecordingListener::arc();
    let mut h3 = exec
        .submit_with(quick_task("task3"), Some(Arc::clone(&listener3) as ListenerRef))
        .await
        .expect("task3 admitted");

    // give task3 a chance to (incorrectly) start
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!listener3.saw("starting"), "third task must wait for a slot");
    assert!(!h1.is_done());
    assert!(!h2.is_done());
    assert!(exec.live_workers().len() <= 2);

    blocker1.stop_blocking();
    blocker2.stop_blocking();

    assert_eq!(h1.wait().await, TaskState::Successful);
    assert_eq!(h2.wait().await, TaskState::Successful);
    assert_eq!(h3.wait().await, TaskState::Successful);
}

#[tokio::test]
async fn queued_tasks_dispatch_in_fifo_order() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let (gate, blocker) = blocking_task("gate");
    let _gate_handle = exec.submit(gate).await.expect("gate admitted");
    assert!(wait_until(|| blocker.is_started(), WAIT).await);

    let mut handles = Vec::new();
    for name in ["first", "second", "third"] {
        let task = common::recording_task(name, Arc::clone(&order));
        handles.push(exec.submit(task).await.expect("task admitted"));
    }

    blocker.stop_blocking();
    for handle in &mut handles {
        assert_eq!(handle.wait().await, TaskState::Successful);
    }
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn counters_track_submissions_and_completions() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));
    assert_eq!(exec.task_count(), 0);
    assert_eq!(exec.completed_task_count(), 0);

    let mut handle = exec.submit(quick_task("one")).await.expect("admitted");
    assert!(handle.result().await.is_ok());

    assert!(
        wait_until(
            || exec.task_count() == 1 && exec.completed_task_count() == 1,
            WAIT
        )
        .await
    );
    assert_eq!(exec.task_count(), 1);
    assert_eq!(exec.completed_task_count(), 1);
}

#[tokio::test]
async fn live_worker_set_follows_running_envelopes() {
    let exec = ManagedExecutor::new(capacity_cfg(2, QUEUE_UNBOUNDED));
    assert!(exec.live_workers().is_empty());

    let (task, blocker) = blocking_task("blocked");
    let mut handle = exec.submit(task).await.expect("admitted");
    assert!(wait_until(|| blocker.is_started(), WAIT).await);
    assert_eq!(exec.live_workers().len(), 1);

    blocker.stop_blocking();
    assert_eq!(handle.wait().await, TaskState::Successful);
    assert!(wait_until(|| exec.live_workers().is_empty(), WAIT).await);
}

#[tokio::test]
async fn hung_tasks_are_reported_past_threshold() {
    let cfg = ExecutorConfig {
        hung_task_threshold: Duration::from_millis(100),
        hung_check_interval: Duration::from_millis(50),
        ..capacity_cfg(2, QUEUE_UNBOUNDED)
    };
    let exec = ManagedExecutor::new(cfg);
    assert!(exec.hung_tasks().is_empty());

    let (task, blocker) = blocking_task("slow");
    let mut handle = exec.submit(task).await.expect("admitted");
    assert!(wait_until(|| blocker.is_started(), WAIT).await);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let hung = exec.hung_tasks();
    assert_eq!(hung.len(), 1);
    assert_eq!(&*hung[0].task_name, "slow");
    assert!(hung[0].elapsed() > Duration::from_millis(100));

    blocker.stop_blocking();
    assert_eq!(handle.wait().await, TaskState::Successful);
    assert!(wait_until(|| exec.hung_tasks().is_empty(), WAIT).await);
}

#[tokio::test]
async fn long_running_mode_suppresses_hung_reporting() {
    let cfg = ExecutorConfig {
        hung_task_threshold: Duration::from_millis(100),
        hung_check_interval: Duration::from_millis(50),
        long_running_tasks: true,
        ..capacity_cfg(2, QUEUE_UNBOUNDED)
    };
    let exec = ManagedExecutor::new(cfg);

    let (task, blocker) = blocking_task("slow-but-expected");
    let mut handle = exec.submit(task).await.expect("admitted");
    assert!(wait_until(|| blocker.is_started(), WAIT).await);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(exec.hung_tasks().is_empty());

    blocker.stop_blocking();
    assert_eq!(handle.wait().await, TaskState::Successful);
    assert!(exec.hung_tasks().is_empty());
}

#[tokio::test]
async fn await_termination_reports_timeout_then_success() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));

    let (task, blocker) = blocking_task("draining");
    let _handle = exec.submit(task).await.expect("admitted");
    assert!(wait_until(|| blocker.is_started(), WAIT).await);

    exec.shutdown();
    assert!(!exec.await_termination(Duration::from_millis(200)).await);

    blocker.stop_blocking();
    assert!(exec.await_termination(Duration::from_secs(10)).await);
    assert!(exec.is_terminated());
}

#[tokio::test]
async fn shutdown_now_on_idle_executor_terminates_immediately() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));
    assert!(!exec.is_shutdown());

    let cancelled = exec.shutdown_now();
    assert!(cancelled.is_empty());
    assert!(exec.is_shutdown());
    assert!(exec.is_terminated());
}

#[tokio::test]
async fn shutdown_now_returns_unstarted_work_and_terminates_after_drain() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));

    let (task1, blocker1) = blocking_task("running");
    let _h1 = exec.submit(task1).await.expect("admitted");
    assert!(wait_until(|| blocker1.is_started(), WAIT).await);

    let _h2 = exec.submit(quick_task("pending")).await.expect("admitted");

    let cancelled = exec.shutdown_now();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].name(), "pending");
    assert!(exec.is_shutdown());
    assert!(!exec.is_terminated());

    // the running payload honors the interruption and the executor drains
    assert!(wait_until(|| exec.is_terminated(), WAIT).await);
}

#[tokio::test]
async fn listener_signals_arrive_in_strict_order() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));
    let listener = RecordingListener::arc();

    let mut handle = exec
        .submit_with(quick_task("observed"), Some(Arc::clone(&listener) as ListenerRef))
        .await
        .expect("admitted");
    assert!(handle.result().await.is_ok());

    assert!(wait_until(|| listener.events().len() == 4, WAIT).await);
    assert_eq!(
        listener.events(),
        vec!["submitted", "starting", "running", "done"]
    );
}

#[tokio::test]
async fn failed_payload_surfaces_on_handle_only() {
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));

    let mut handle = exec
        .submit(failing_task("broken", "disk on fire"))
        .await
        .expect("admitted");

    let err = handle.result().await.expect_err("payload failed");
    assert_eq!(err.as_label(), "task_failed");
    assert_eq!(handle.state(), TaskState::Failed);
    assert!(!handle.is_cancelled());

    // the executor keeps running: a later task still completes
    let mut ok = exec.submit(quick_task("fine")).await.expect("admitted");
    assert!(ok.result().await.is_ok());
}

/// Ambient slot the test propagator writes into.
static AMBIENT: AtomicU64 = AtomicU64::new(0);

struct AmbientPropagator {
    value: u64,
}

impl ContextPropagator for AmbientPropagator {
    fn capture(&self) -> ContextSnapshot {
        ContextSnapshot::new(self.value)
    }

    fn apply(&self, snapshot: &ContextSnapshot) -> ContextGuard {
        let value = *snapshot.downcast_ref::<u64>().expect("u64 snapshot");
        AMBIENT.store(value, Ordering::SeqCst);
        ContextGuard::new(|| AMBIENT.store(0, Ordering::SeqCst))
    }
}

#[tokio::test]
async fn context_is_applied_during_execution_and_reset_after() {
    let exec = ManagedExecutor::builder(capacity_cfg(1, QUEUE_UNBOUNDED))
        .with_propagator(Arc::new(AmbientPropagator { value: 42 }))
        .build();

    let observed = Arc::new(AtomicU64::new(0));
    let probe = {
        let observed = Arc::clone(&observed);
        TaskFn::arc("probe", move |_ctx: CancellationToken| {
            let observed = Arc::clone(&observed);
            async move {
                observed.store(AMBIENT.load(Ordering::SeqCst), Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        })
    };

    let mut handle = exec.submit(probe).await.expect("admitted");
    assert!(handle.result().await.is_ok());

    assert_eq!(observed.load(Ordering::SeqCst), 42);
    assert!(wait_until(|| AMBIENT.load(Ordering::SeqCst) == 0, WAIT).await);
}

struct KindCollector {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for KindCollector {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "KindCollector"
    }
}

#[tokio::test]
async fn subscribers_observe_the_lifecycle_event_stream() {
    let collector = Arc::new(KindCollector {
        kinds: Mutex::new(Vec::new()),
    });
    let exec = ManagedExecutor::builder(capacity_cfg(1, QUEUE_UNBOUNDED))
        .with_subscriber(Arc::clone(&collector) as Arc<dyn Subscribe>)
        .build();

    let mut handle = exec.submit(quick_task("observed")).await.expect("admitted");
    assert!(handle.result().await.is_ok());

    let expected = [
        EventKind::TaskSubmitted,
        EventKind::TaskStarting,
        EventKind::TaskRunning,
        EventKind::TaskDone,
    ];
    assert!(
        wait_until(
            || {
                let kinds = collector.kinds.lock().unwrap();
                expected.iter().all(|k| kinds.contains(k))
            },
            WAIT
        )
        .await
    );
}

#[tokio::test]
async fn completed_worker_records_honor_retention_window() {
    let cfg = ExecutorConfig {
        thread_lifetime: Duration::from_secs(30),
        ..capacity_cfg(1, QUEUE_UNBOUNDED)
    };
    let exec = ManagedExecutor::new(cfg);

    let mut handle = exec.submit(quick_task("kept")).await.expect("admitted");
    assert!(handle.result().await.is_ok());

    assert!(wait_until(|| exec.live_workers().is_empty(), WAIT).await);
    assert!(wait_until(|| exec.retired_workers().len() == 1, WAIT).await);
    assert_eq!(&*exec.retired_workers()[0].task_name, "kept");

    // zero lifetime purges immediately
    let exec = ManagedExecutor::new(capacity_cfg(1, QUEUE_UNBOUNDED));
    let mut handle = exec.submit(quick_task("gone")).await.expect("admitted");
    assert!(handle.result().await.is_ok());
    assert!(wait_until(|| exec.live_workers().is_empty(), WAIT).await);
    assert!(exec.retired_workers().is_empty());
}
