//! evig - reactive in-process document store
//!
//! evig keeps an authoritative in-memory copy of a named collection of JSON
//! documents, mutates it only through structural diffs, and propagates each
//! change set to a hash-based key-value backend and to derived views.
//!
//! # Quick Start
//!
//! ```ignore
//! use evig::{Collection, CollectionOptions, Document, MemoryBackend};
//! use std::sync::Arc;
//!
//! let users = Collection::create(
//!     "users",
//!     Arc::new(MemoryBackend::new()),
//!     CollectionOptions::default(),
//!     None,
//! )
//! .await?;
//!
//! users.insert(Document::new("1")).await?;
//! users.update("1", |doc| { doc.set("name", "Alice"); }).await?;
//! ```
//!
//! # Architecture
//!
//! Mutations are queued per collection and run one at a time. Each one
//! produces structural patches, which are emitted in several forms and
//! folded into one atomic backend batch. Views subscribe to a collection
//! and re-publish the subset of patches they care about.

pub use evig_concurrency::{Job, QueueStats, SerialQueue};
pub use evig_core::*;
pub use evig_engine::*;
pub use evig_storage::{BackendStats, MemoryBackend};
