//! In-memory hash backend
//!
//! Replaces an external hash store (one map of fields per storage key)
//! with DashMap + IndexMap.
//!
//! # Design
//!
//! - DashMap: sharded by storage key, lock-free reads
//! - IndexMap with FxHasher: O(1) field lookups, stable field order
//! - A batch holds the key's shard lock for its whole duration, so other
//!   readers observe either none or all of its writes
//!
//! Empty hashes are dropped, so `exists` turns false once the last field
//! of a key is deleted.

use async_trait::async_trait;
use dashmap::DashMap;
use evig_core::{Backend, Error, FieldWrite, Result, WriteBatch};
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

type FieldMap = IndexMap<String, String, BuildHasherDefault<FxHasher>>;

/// Operation counters snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// `exists` calls
    pub exists_checks: u64,
    /// `read_all_fields` calls
    pub bulk_reads: u64,
    /// `read_field` calls
    pub field_reads: u64,
    /// Committed batches
    pub batches: u64,
    /// Field sets across all committed batches
    pub field_writes: u64,
    /// Field deletes across all committed batches
    pub field_deletes: u64,
}

/// In-memory [`Backend`] implementation
///
/// Counters use Relaxed ordering: they are observational only.
#[derive(Default)]
pub struct MemoryBackend {
    hashes: DashMap<String, FieldMap>,
    fail_writes: AtomicBool,
    exists_checks: AtomicU64,
    bulk_reads: AtomicU64,
    field_reads: AtomicU64,
    batches: AtomicU64,
    field_writes: AtomicU64,
    field_deletes: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the operation counters
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            exists_checks: self.exists_checks.load(Ordering::Relaxed),
            bulk_reads: self.bulk_reads.load(Ordering::Relaxed),
            field_reads: self.field_reads.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            field_writes: self.field_writes.load(Ordering::Relaxed),
            field_deletes: self.field_deletes.load(Ordering::Relaxed),
        }
    }

    /// Make every following batch fail with [`Error::Backend`] until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Drop every field of `key`
    pub fn delete_key(&self, key: &str) -> bool {
        self.hashes.remove(key).is_some()
    }

    /// Number of fields stored under `key`
    pub fn field_count(&self, key: &str) -> usize {
        self.hashes.get(key).map(|h| h.len()).unwrap_or(0)
    }

    /// Synchronous single-field read, bypassing the counters
    pub fn peek(&self, key: &str, field: &str) -> Option<String> {
        self.hashes.get(key).and_then(|h| h.get(field).cloned())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.exists_checks.fetch_add(1, Ordering::Relaxed);
        Ok(self.hashes.get(key).map(|h| !h.is_empty()).unwrap_or(false))
    }

    async fn read_all_fields(&self, key: &str) -> Result<IndexMap<String, String>> {
        self.bulk_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .hashes
            .get(key)
            .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn read_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.field_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.peek(key, field))
    }

    async fn write_batch(&self, key: &str, batch: WriteBatch) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(Error::backend(format!(
                "write to \"{}\" rejected by memory backend",
                key
            )));
        }
        if batch.is_empty() {
            return Ok(());
        }

        let mut sets = 0u64;
        let mut deletes = 0u64;
        {
            let mut hash = self.hashes.entry(key.to_string()).or_default();
            for write in batch.into_writes() {
                match write {
                    FieldWrite::Set { field, value } => {
                        hash.insert(field, value);
                        sets += 1;
                    }
                    FieldWrite::Delete { field } => {
                        hash.shift_remove(&field);
                        deletes += 1;
                    }
                }
            }
        }
        self.hashes.remove_if(key, |_, h| h.is_empty());

        self.batches.fetch_add(1, Ordering::Relaxed);
        self.field_writes.fetch_add(sets, Ordering::Relaxed);
        self.field_deletes.fetch_add(deletes, Ordering::Relaxed);
        debug!(target: "evig::backend", key, sets, deletes, "Batch committed");
        Ok(())
    }
}
