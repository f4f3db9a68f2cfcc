//! # Executor configuration.
//!
//! Provides [`ExecutorConfig`], the centralized settings for a
//! [`ManagedExecutor`](crate::ManagedExecutor).
//!
//! ## Sentinel values
//! - `queue_capacity = QUEUE_UNBOUNDED` → no queue-depth limit
//! - `queue_capacity = 0` → no queueing at all (direct handoff only)
//! - `hung_task_threshold = 0s` → hung-task detection disabled
//! - `thread_lifetime = 0s` → completed worker records are purged immediately
//!
//! Prefer the accessor methods over raw field reads to avoid sprinkling
//! sentinel checks across call sites.

use std::time::Duration;

use crate::policies::RejectPolicy;

/// Sentinel for [`ExecutorConfig::queue_capacity`]: no queue-depth limit.
pub const QUEUE_UNBOUNDED: usize = usize::MAX;

/// Configuration for a managed executor.
///
/// Defines:
/// - **Identity**: executor name for diagnostics and log lines
/// - **Capacity**: max parallel tasks, queue depth, rejection policy
/// - **Hung detection**: threshold, scan interval, long-running-tasks flag
/// - **Worker retention**: how long completed worker records are kept
/// - **Event system**: bus capacity for subscriber delivery
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Executor name, used in events and log lines.
    pub name: String,

    /// Maximum number of tasks simultaneously starting or running.
    ///
    /// Values below 1 are clamped to 1 by [`ExecutorConfig::max_parallel`].
    pub max_parallel_tasks: usize,

    /// Capacity of the pending-task queue.
    ///
    /// - `QUEUE_UNBOUNDED` → unlimited queueing
    /// - `0` → no queueing: a submission either takes a free slot
    ///   immediately or triggers the rejection policy
    /// - `n > 0` → at most `n` tasks wait in FIFO order
    pub queue_capacity: usize,

    /// Elapsed runtime after which a running task is reported hung.
    ///
    /// `Duration::ZERO` disables hung-task detection entirely.
    pub hung_task_threshold: Duration,

    /// Period of the background hung-task monitor scan.
    pub hung_check_interval: Duration,

    /// Declares that long execution is expected and not anomalous.
    ///
    /// When `true`, no task is ever reported hung, regardless of elapsed
    /// time or threshold.
    pub long_running_tasks: bool,

    /// How long metadata of a completed worker is retained for diagnostics.
    ///
    /// `Duration::ZERO` purges records immediately. Retention never implies
    /// reuse of the underlying execution resource.
    pub thread_lifetime: Duration,

    /// Behavior when the queue is full and no concurrency slot is free.
    pub reject_policy: RejectPolicy,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events
    /// observe `Lagged` and skip older items. Minimum value is 1 (clamped).
    pub bus_capacity: usize,
}

impl ExecutorConfig {
    /// Creates a configuration with the given name and library defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the parallel-task limit, clamped to a minimum of 1.
    #[inline]
    pub fn max_parallel(&self) -> usize {
        self.max_parallel_tasks.max(1)
    }

    /// Returns the queue-depth limit as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` queued tasks (`n` may be 0)
    #[inline]
    pub fn queue_limit(&self) -> Option<usize> {
        if self.queue_capacity == QUEUE_UNBOUNDED {
            None
        } else {
            Some(self.queue_capacity)
        }
    }

    /// Returns the hung-task threshold as an `Option`.
    ///
    /// `None` means detection is disabled.
    #[inline]
    pub fn hung_detection(&self) -> Option<Duration> {
        if self.hung_task_threshold == Duration::ZERO {
            None
        } else {
            Some(self.hung_task_threshold)
        }
    }

    /// Returns the completed-worker retention window as an `Option`.
    ///
    /// `None` means records are purged immediately.
    #[inline]
    pub fn retention(&self) -> Option<Duration> {
        if self.thread_lifetime == Duration::ZERO {
            None
        } else {
            Some(self.thread_lifetime)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ExecutorConfig {
    /// Default configuration:
    ///
    /// - `name = "taskwarden"`
    /// - `max_parallel_tasks = 8`
    /// - `queue_capacity = QUEUE_UNBOUNDED`
    /// - `hung_task_threshold = 0s` (detection disabled)
    /// - `hung_check_interval = 250ms`
    /// - `long_running_tasks = false`
    /// - `thread_lifetime = 0s` (immediate purge)
    /// - `reject_policy = RejectPolicy::Abort`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            name: "taskwarden".to_string(),
            max_parallel_tasks: 8,
            queue_capacity: QUEUE_UNBOUNDED,
            hung_task_threshold: Duration::ZERO,
            hung_check_interval: Duration::from_millis(250),
            long_running_tasks: false,
            thread_lifetime: Duration::ZERO,
            reject_policy: RejectPolicy::Abort,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_limit_sentinels() {
        let mut cfg = ExecutorConfig::default();
        assert_eq!(cfg.queue_limit(), None);

        cfg.queue_capacity = 0;
        assert_eq!(cfg.queue_limit(), Some(0));

        cfg.queue_capacity = 4;
        assert_eq!(cfg.queue_limit(), Some(4));
    }

    #[test]
    fn test_hung_detection_disabled_by_default() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.hung_detection(), None);

        let cfg = ExecutorConfig {
            hung_task_threshold: Duration::from_secs(1),
            ..ExecutorConfig::default()
        };
        assert_eq!(cfg.hung_detection(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_max_parallel_clamped() {
        let cfg = ExecutorConfig {
            max_parallel_tasks: 0,
            ..ExecutorConfig::default()
        };
        assert_eq!(cfg.max_parallel(), 1);
    }

    #[test]
    fn test_retention_sentinel() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.retention(), None);

        let cfg = ExecutorConfig {
            thread_lifetime: Duration::from_secs(3),
            ..ExecutorConfig::default()
        };
        assert_eq!(cfg.retention(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_named_keeps_defaults() {
        let cfg = ExecutorConfig::named("payments");
        assert_eq!(cfg.name, "payments");
        assert_eq!(cfg.bus_capacity, 1024);
    }
}
