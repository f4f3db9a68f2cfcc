//! # Executor events.
//!
//! This module provides the global observability surface:
//! - [`Event`] / [`EventKind`] - lifecycle and shutdown events with metadata
//! - [`Bus`] - broadcast channel fanning events out to subscriber workers

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
