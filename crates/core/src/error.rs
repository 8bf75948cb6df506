//! Error types for evig
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::json::PathError;
use thiserror::Error;

/// Result type alias for evig operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the evig document store
#[derive(Debug, Error)]
pub enum Error {
    /// Insert targeted an id that already exists in the collection
    #[error("Document with id \"{id}\" already exists on {collection}")]
    DuplicateId {
        /// Offending document id
        id: String,
        /// Collection name
        collection: String,
    },

    /// Update or remove targeted an id that is not in the collection
    #[error("Document with id \"{id}\" does not exist on {collection}")]
    NotFound {
        /// Missing document id
        id: String,
        /// Collection name
        collection: String,
    },

    /// Addressable patch path is malformed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Backend `patch` operation without its sub-patch payload
    #[error("Patch missing in backend operation with field \"{0}\"")]
    MissingPatch(String),

    /// Backend `patch` operation targets a field the backend does not have
    #[error("Field \"{field}\" not found in backend for key \"{key}\"")]
    FieldNotFound {
        /// Field (document id) that was looked up
        field: String,
        /// Backend storage key
        key: String,
    },

    /// Unrecognized operation kind
    #[error("Unknown op: {0}")]
    UnknownOp(String),

    /// A queued task failed without producing a typed error
    #[error("Unknown error")]
    UnknownTaskFailure,

    /// The serialization queue can no longer run jobs
    #[error("Serialization queue is closed")]
    QueueClosed,

    /// Value does not satisfy the document shape
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Structural edit could not be applied to a value
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend client failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Create a backend error from any displayable failure
    pub fn backend(msg: impl std::fmt::Display) -> Self {
        Error::Backend(msg.to_string())
    }
}
