//! # Event subscribers.
//!
//! Subscribers observe the executor's event stream without participating in
//! task execution:
//! - [`Subscribe`] - the subscriber capability
//! - [`SubscriberSet`] - non-blocking fan-out with per-subscriber queues
//! - [`LogWriter`] - embedded subscriber that logs events via `tracing`

mod embedded;
mod set;
mod subscribe;

pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
