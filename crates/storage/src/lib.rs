//! Storage layer for evig
//!
//! This crate implements the reference backend:
//! - MemoryBackend: DashMap-sharded hashes of serialized documents
//! - Atomic per-key batches
//! - Operation counters for observing read/write behaviour
//!
//! Production deployments inject their own `evig_core::Backend` client;
//! this one backs tests and single-process embeddings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;

pub use memory::{BackendStats, MemoryBackend};
