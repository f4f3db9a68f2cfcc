//! # Admission policies.
//!
//! This module provides [`RejectPolicy`], which controls what happens when a
//! submission arrives while the queue is full and no concurrency slot is
//! free.

mod reject;

pub use reject::RejectPolicy;
