//! Backend abstraction
//!
//! This module defines the [`Backend`] trait: a hash-based key-value store
//! where each storage key holds a map of fields to serialized documents.
//! Collections persist through it and never assume a concrete store.
//!
//! Thread safety: implementations are shared as `Arc<dyn Backend>` across
//! tasks (requires Send + Sync).

use crate::error::Result;
use async_trait::async_trait;
use indexmap::IndexMap;

/// One field-level write inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWrite {
    /// Store `value` under `field`
    Set {
        /// Field name
        field: String,
        /// Serialized document
        value: String,
    },
    /// Remove `field`
    Delete {
        /// Field name
        field: String,
    },
}

impl FieldWrite {
    /// Field this write targets
    pub fn field(&self) -> &str {
        match self {
            FieldWrite::Set { field, .. } | FieldWrite::Delete { field } => field,
        }
    }
}

/// Ordered set of field writes committed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<FieldWrite>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a field write
    pub fn set_field(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.writes.push(FieldWrite::Set {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Queue a field delete
    pub fn delete_field(&mut self, field: impl Into<String>) -> &mut Self {
        self.writes.push(FieldWrite::Delete {
            field: field.into(),
        });
        self
    }

    /// Queued writes in order
    pub fn writes(&self) -> &[FieldWrite] {
        &self.writes
    }

    /// Consume into the queued writes
    pub fn into_writes(self) -> Vec<FieldWrite> {
        self.writes
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Hash-based key-value backend
///
/// Every method may suspend on I/O. Timeouts, reconnection and retries are
/// the client's concern; errors surface as [`crate::Error::Backend`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// True if `key` holds any fields
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Every field of `key` with its serialized document
    ///
    /// Returns an empty map when the key does not exist.
    async fn read_all_fields(&self, key: &str) -> Result<IndexMap<String, String>>;

    /// One field of `key`, or `None` if absent
    async fn read_field(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Apply every write of `batch` to `key` as one indivisible operation
    ///
    /// Either all writes become visible or none do.
    async fn write_batch(&self, key: &str, batch: WriteBatch) -> Result<()>;

    /// Store a single field
    async fn set_field(&self, key: &str, field: &str, value: String) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.set_field(field, value);
        self.write_batch(key, batch).await
    }

    /// Delete a single field
    async fn delete_field(&self, key: &str, field: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete_field(field);
        self.write_batch(key, batch).await
    }
}
