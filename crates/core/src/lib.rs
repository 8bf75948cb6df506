//! Core types and traits for evig
//!
//! This crate defines the foundational types used throughout the system:
//! - Document: JSON object with an identity key
//! - Patch, AddressablePatch, BackendOp: the three patch shapes
//! - Path operations: add/replace/delete at a segment path
//! - Error: Error type hierarchy
//! - Backend: hash-based key-value store abstraction

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod json;
pub mod patch;
pub mod traits;

pub use document::{Document, ID_KEY};
pub use error::{Error, Result};
pub use json::{
    add_at_path, delete_at_path, get_at_path, get_at_path_mut, is_plain_object, replace_at_path,
    PathError,
};
pub use patch::{
    apply_patches, join_path, split_path, AddressablePatch, BackendOp, BackendOpKind, Patch,
    PatchOp,
};
pub use traits::{Backend, FieldWrite, WriteBatch};
