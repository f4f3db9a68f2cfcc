//! Executor core: admission, dispatch, and lifecycle.
//!
//! Internal modules:
//! - [`executor`]: admission queue, slot accounting, shutdown coordinator;
//! - [`dispatch`]: runs one envelope on its worker (context, listener order,
//!   terminal bookkeeping);
//! - [`envelope`]: per-submission state machine and the caller-facing
//!   [`TaskHandle`];
//! - [`workers`]: worker-factory port and live/retired worker records;
//! - [`monitor`]: background hung-task scan and retired-record purge;
//! - [`state`]: executor lifecycle states;
//! - [`builder`]: wiring of bus, subscribers, propagator, and factory.

mod builder;
mod dispatch;
mod envelope;
mod executor;
mod monitor;
mod state;
mod workers;

pub use builder::ExecutorBuilder;
pub use envelope::{TaskHandle, TaskId, TaskState};
pub use executor::ManagedExecutor;
pub use state::ExecutorState;
pub use workers::{TokioWorkerFactory, WorkerFactory, WorkerInfo};
