//! Concurrency layer for evig
//!
//! This crate implements the serialization queue that totally orders
//! mutations of one collection:
//! - SerialQueue: FIFO runner, at most one job in flight
//! - Job: awaitable handle carrying the job's typed result
//! - Panic isolation: a panicking job rejects alone, the loop continues

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod queue;

pub use queue::{Job, QueueStats, SerialQueue};
