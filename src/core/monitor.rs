//! # Hung-task monitor.
//!
//! A periodic background loop, independent of the worker units, that:
//! - scans running envelopes against the hung threshold and publishes one
//!   advisory [`EventKind::TaskHung`] per newly hung envelope;
//! - purges retired worker records whose retention window elapsed.
//!
//! The monitor only reads running-envelope timestamps; it never cancels or
//! interrupts anything. It exits when the executor's runtime token is
//! cancelled (termination or drop).

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::events::{Event, EventKind};

use super::envelope::TaskId;
use super::executor::ManagedExecutor;

/// Spawns the monitor loop for `exec`.
///
/// Holds only a `Weak` reference so an abandoned executor can drop.
pub(crate) fn spawn_monitor(exec: &Arc<ManagedExecutor>) {
    let weak: Weak<ManagedExecutor> = Arc::downgrade(exec);
    let token = exec.runtime_token().clone();
    // interval() panics on a zero period
    let period = exec
        .config()
        .hung_check_interval
        .max(Duration::from_millis(10));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately; skip it
        ticker.tick().await;

        let mut reported: HashSet<TaskId> = HashSet::new();
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(exec) = weak.upgrade() else { break };
                    exec.purge_retired();

                    let hung = exec.hung_tasks();
                    reported.retain(|id| hung.iter().any(|w| w.task_id == *id));
                    for worker in &hung {
                        if reported.insert(worker.task_id) {
                            exec.bus().publish(
                                Event::now(EventKind::TaskHung)
                                    .with_task(Arc::clone(&worker.task_name))
                                    .with_id(worker.task_id)
                                    .with_elapsed(worker.elapsed()),
                            );
                            tracing::warn!(
                                executor = %exec.name(),
                                task = %worker.task_name,
                                id = worker.task_id,
                                elapsed_ms = worker.elapsed().as_millis() as u64,
                                "task exceeded hung threshold"
                            );
                        }
                    }
                }
            }
        }
    });
}
