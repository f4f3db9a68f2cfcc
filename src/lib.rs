//! # taskwarden
//!
//! **Taskwarden** is a managed bounded-concurrency task executor for Rust.
//!
//! It accepts units of work, admits or rejects them under a capacity
//! policy, runs each admitted task on an ephemeral worker, propagates
//! ambient invocation context across the submission/execution boundary,
//! notifies listeners of every lifecycle transition, detects tasks that run
//! abnormally long, and provides an orderly shutdown protocol with correct
//! cancellation semantics.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     caller ──► submit(task, listener?)
//!                    │  capture context, admission under one lock
//!                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ManagedExecutor                                                  │
//! │  - pending queue (FIFO, bounded)                                  │
//! │  - running set  (≤ max_parallel_tasks slots)                      │
//! │  - executor state (Accepting → ShuttingDown/Stopped → Terminated) │
//! │  - counters (submitted / completed)                               │
//! └───────┬──────────────────────┬────────────────────────┬───────────┘
//!         ▼                      ▼                        │
//!   ┌───────────┐          ┌───────────┐                  │ Events:
//!   │  worker   │          │  worker   │   (one ephemeral │ - TaskSubmitted
//!   │ (task #1) │          │ (task #2) │    unit per task)│ - TaskStarting
//!   └─────┬─────┘          └─────┬─────┘                  │ - TaskRunning
//!         │ listener signals     │                        │ - TaskDone/...
//!         │ context apply/reset  │                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Bus (broadcast channel)                      │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                        SubscriberSet (per-sub queues)
//!                        worker1   worker2  ...  workerN
//!                           ▼         ▼            ▼
//!                       sub1.on_  sub2.on_     subN.on_
//!                        event()   event()      event()
//!
//!     Hung-Task Monitor (periodic, advisory) ──► TaskHung events
//! ```
//!
//! ### Envelope lifecycle
//! ```text
//! Submitted ──► Queued ──► Starting ──► Running ──► Successful
//!                 │                        │    └──► Failed
//!                 └────────► Aborted ◄─────┘
//!
//! submit():
//!   ├─► capture ambient context (submitting unit)
//!   ├─► admission: slot free → dispatch | queue room → enqueue
//!   │              exhausted → RejectPolicy (Abort/DiscardOldest/
//!   │                                        Discard/Run)
//!   └─► listener.on_submitted, handle returned
//!
//! worker:
//!   ├─► on_starting ─► apply context ─► on_running ─► payload
//!   ├─► reset context (every exit path, including errors)
//!   ├─► on_done / on_aborted, terminal event published
//!   └─► release slot ─► pull next queued envelope (FIFO, atomic)
//!
//! shutdown():     drain queued + running, then Terminated
//! shutdown_now(): abort queued (returned to caller), signal interruption
//!                 to running workers, Terminated once they stop
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                         |
//! |-------------------|----------------------------------------------------------------------|--------------------------------------------|
//! | **Submission**    | Bounded admission with pluggable overflow policies.                  | [`ManagedExecutor`], [`RejectPolicy`]      |
//! | **Listeners**     | Per-task lifecycle callbacks in strict order.                        | [`TaskListener`], [`TaskHandle`]           |
//! | **Context**       | Capture/apply/reset of ambient context around execution.             | [`ContextPropagator`], [`ContextGuard`]    |
//! | **Hung detection**| Advisory reporting of tasks running past a threshold.                | [`ExecutorConfig`], [`WorkerInfo`]         |
//! | **Shutdown**      | Graceful drain or forced cancellation with interruption signaling.   | [`ExecutorState`]                          |
//! | **Observability** | Broadcast events with non-blocking subscriber fan-out.               | [`Subscribe`], [`Event`], [`LogWriter`]    |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use taskwarden::{ExecutorConfig, ManagedExecutor, TaskError, TaskFn, TaskRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = ExecutorConfig::named("demo");
//!     cfg.max_parallel_tasks = 2;
//!
//!     let exec = ManagedExecutor::new(cfg);
//!
//!     let hello: TaskRef = TaskFn::arc("hello", |ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() {
//!             return Err(TaskError::Canceled);
//!         }
//!         println!("Hello from task!");
//!         Ok(())
//!     });
//!
//!     let mut handle = exec.submit(hello).await?;
//!     handle.result().await?;
//!
//!     exec.shutdown();
//!     assert!(exec.await_termination(Duration::from_secs(5)).await);
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::{ExecutorConfig, QUEUE_UNBOUNDED};
pub use context::{ContextGuard, ContextPropagator, ContextSnapshot, NoopPropagator};
pub use core::{
    ExecutorBuilder, ExecutorState, ManagedExecutor, TaskHandle, TaskId, TaskState,
    TokioWorkerFactory, WorkerFactory, WorkerInfo,
};
pub use error::{SubmitError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::RejectPolicy;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{ListenerRef, Task, TaskFn, TaskInfo, TaskListener, TaskRef};
