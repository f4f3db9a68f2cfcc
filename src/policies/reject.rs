//! # Rejection policy
//!
//! When a submission arrives while every concurrency slot is taken **and**
//! the pending queue is at capacity, the rejection policy decides what to
//! do. The decision is made atomically under the same lock as the
//! queue-depth and slot-count check.
//!
//! ## Invariants
//! - `Abort` never creates an envelope and never touches the counters.
//! - Every other variant admits exactly one envelope and aborts at most one.

/// Policy applied when queue and concurrency slots are exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RejectPolicy {
    /// Fail the submission immediately with
    /// [`SubmitError::QueueFull`](crate::SubmitError::QueueFull).
    ///
    /// Use when:
    /// - Callers can handle backpressure themselves
    /// - Losing work silently is unacceptable
    #[default]
    Abort,

    /// Abort the oldest queued task and admit the new one in its place.
    ///
    /// Use when:
    /// - Fresh work invalidates stale work
    /// - Example: periodic refresh jobs where only the latest matters
    DiscardOldest,

    /// Admit the new task and abort it immediately; the caller receives a
    /// handle that already reports cancelled.
    ///
    /// Use when:
    /// - Overflow work is genuinely optional
    /// - Callers still want a uniform handle to observe
    Discard,

    /// Execute the new task inline on the submitting execution unit,
    /// bypassing queue and slots.
    ///
    /// Use when:
    /// - Overload should slow producers down instead of dropping work
    Run,
}

impl RejectPolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RejectPolicy::Abort => "abort",
            RejectPolicy::DiscardOldest => "discard_oldest",
            RejectPolicy::Discard => "discard",
            RejectPolicy::Run => "caller_runs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_abort() {
        assert_eq!(RejectPolicy::default(), RejectPolicy::Abort);
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(RejectPolicy::Abort.as_label(), "abort");
        assert_eq!(RejectPolicy::DiscardOldest.as_label(), "discard_oldest");
        assert_eq!(RejectPolicy::Discard.as_label(), "discard");
        assert_eq!(RejectPolicy::Run.as_label(), "caller_runs");
    }
}
