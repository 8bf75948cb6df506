//! Document engine for evig
//!
//! This crate orchestrates the lower layers:
//! - Collection: authoritative snapshot, queued mutations, persistence
//! - View: filtered, pruned projections with their own patch stream
//! - Patch pipeline: diff, expand, translate, apply to the backend
//! - Configuration via `evig.toml`
//!
//! The engine is the only component that knows about:
//! - Snapshot publication and event ordering
//! - Commit-then-persist sequencing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod collection;
pub mod config;
pub mod events;
pub mod expand;
pub mod produce;
pub mod reconcile;
pub mod snapshot;
pub mod translate;
pub mod view;

pub use apply::{apply_backend_ops, apply_raw_backend_ops};
pub use collection::{Collection, Seed};
pub use config::{
    CollectionOptions, EvigConfig, Filter, ViewConfig, ViewOptions, CONFIG_FILE_NAME,
    DEFAULT_PREFIX,
};
pub use events::{EventBus, Handler, PatchBatch, PatchEvent, PatchSource, SubscriptionId};
pub use expand::{expand_patch, expand_patches};
pub use produce::{diff_values, produce};
pub use reconcile::{reconcile, reconcile_value};
pub use snapshot::{Snapshot, SnapshotDraft};
pub use translate::{to_addressable, to_backend_op, to_backend_ops};
pub use view::View;
