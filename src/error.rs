//! Error types used by the executor and by submitted tasks.
//!
//! This module defines two error enums:
//!
//! - [`SubmitError`] — admission refused a submission (the executor is no
//!   longer accepting, or capacity was exhausted under the `Abort` policy).
//! - [`TaskError`] — a submitted payload failed or honored cancellation.
//!
//! Payload errors are attached to the envelope's outcome and surfaced to
//! whoever awaits that handle; they never enter the scheduler's control flow.
//! Both types provide `as_label` helpers for logs/metrics.

use thiserror::Error;

/// Errors returned by [`ManagedExecutor::submit`](crate::ManagedExecutor::submit).
///
/// A rejected submission never creates an envelope and never touches the
/// task counters.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The executor is shutting down, stopped, or terminated.
    #[error("executor is not accepting new tasks")]
    Shutdown,

    /// Queue and concurrency slots are exhausted and the configured policy
    /// is [`RejectPolicy::Abort`](crate::RejectPolicy::Abort).
    #[error("task queue full and no concurrency slot free")]
    QueueFull,
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::Shutdown => "submit_shutdown",
            SubmitError::QueueFull => "submit_queue_full",
        }
    }
}

/// Errors produced by task execution.
///
/// `Clone` so the recorded outcome can be handed to any number of handle
/// waiters.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The payload raised an error. Recorded on the envelope as the
    /// `Failed` outcome.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The payload observed the interruption signal and stopped
    /// cooperatively, or the envelope was cancelled before it ever started.
    #[error("task cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "cancelled".to_string(),
        }
    }

    /// Wraps an arbitrary error value as a payload failure.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }
}
