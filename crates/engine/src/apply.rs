//! Backend patch application
//!
//! Folds a batch of [`BackendOp`]s into one pending value per field, then
//! commits everything as a single atomic [`WriteBatch`]:
//!
//! - `set`   -> the field's pending value becomes the document
//! - `del`   -> the field is pending deletion
//! - `patch` -> the field is read from the backend once (unless already
//!   pending), the edit is applied to the pending copy
//!
//! A field touched by several ops is therefore written once, with its
//! final value.

use evig_core::{Backend, BackendOp, Document, Error, Result, WriteBatch};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

enum Pending {
    Write(Document),
    Delete,
}

/// Fold `ops` and commit them to `storage_key` in one batch
///
/// Nothing is written if any op fails. An empty op list performs no I/O.
pub async fn apply_backend_ops(
    backend: &dyn Backend,
    storage_key: &str,
    ops: &[BackendOp],
) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }

    let mut pending: IndexMap<String, Pending> = IndexMap::new();
    let mut reads = 0usize;
    for op in ops {
        match op {
            BackendOp::Set { field, value } => {
                pending.insert(field.clone(), Pending::Write(value.clone()));
            }
            BackendOp::Del { field } => {
                pending.insert(field.clone(), Pending::Delete);
            }
            BackendOp::Patch { field, patch } => {
                let patch = patch
                    .as_ref()
                    .ok_or_else(|| Error::MissingPatch(field.clone()))?;
                let not_found = || Error::FieldNotFound {
                    field: field.clone(),
                    key: storage_key.to_string(),
                };

                let current = match pending.get(field) {
                    Some(Pending::Write(doc)) => doc.clone(),
                    Some(Pending::Delete) => return Err(not_found()),
                    None => {
                        reads += 1;
                        let text = backend
                            .read_field(storage_key, field)
                            .await?
                            .ok_or_else(not_found)?;
                        Document::decode(&text)?
                    }
                };

                let mut root = current.into_value();
                patch.to_structural().apply(&mut root)?;
                let Value::Object(fields) = root else {
                    return Err(Error::InvalidDocument(format!(
                        "patch on \"{}\" replaced the document root",
                        field
                    )));
                };
                pending.insert(field.clone(), Pending::Write(Document::from_map(fields)));
            }
        }
    }

    let mut batch = WriteBatch::new();
    for (field, value) in pending {
        match value {
            Pending::Write(doc) => {
                batch.set_field(field, doc.encode()?);
            }
            Pending::Delete => {
                batch.delete_field(field);
            }
        }
    }

    debug!(
        target: "evig::backend",
        key = storage_key,
        ops = ops.len(),
        writes = batch.len(),
        reads,
        "Flushing backend ops"
    );
    backend.write_batch(storage_key, batch).await
}

/// Decode wire-format ops and apply them
///
/// Unrecognized op names fail with [`Error::UnknownOp`] before any I/O.
pub async fn apply_raw_backend_ops(
    backend: &dyn Backend,
    storage_key: &str,
    raw: Vec<Value>,
) -> Result<()> {
    let ops = raw
        .into_iter()
        .map(BackendOp::from_value)
        .collect::<Result<Vec<_>>>()?;
    apply_backend_ops(backend, storage_key, &ops).await
}
