//! Patch format translation
//!
//! Structural patches become addressable patches by joining their escaped
//! segments with `/`. Addressable patches become backend operations by
//! splitting off the leading segment, which names the backend field:
//!
//! | Path            | Op          | Backend op                     |
//! |-----------------|-------------|--------------------------------|
//! | `field`         | add/replace | `set(field, value)`            |
//! | `field`         | remove      | `del(field)`                   |
//! | `field/subpath` | any         | `patch(field, {op, subpath})`  |

use evig_core::patch::unescape_segment;
use evig_core::{AddressablePatch, BackendOp, Document, Error, Patch, PatchOp, Result};
use serde_json::Value;

/// Structural -> addressable, preserving order
pub fn to_addressable(patches: &[Patch]) -> Vec<AddressablePatch> {
    patches.iter().map(Patch::to_addressable).collect()
}

/// Translate one addressable patch into a backend operation
pub fn to_backend_op(patch: &AddressablePatch) -> Result<BackendOp> {
    let (head, subpath) = match patch.path.split_once('/') {
        Some((head, rest)) => (head, Some(rest)),
        None => (patch.path.as_str(), None),
    };
    if head.is_empty() {
        return Err(Error::InvalidPath(patch.path.clone()));
    }
    let field = unescape_segment(head);

    match subpath {
        Some(subpath) => Ok(BackendOp::Patch {
            field,
            patch: Some(AddressablePatch::new(
                patch.op,
                subpath,
                patch.value.clone(),
            )),
        }),
        None => match patch.op {
            PatchOp::Add | PatchOp::Replace => match &patch.value {
                Some(Value::Object(fields)) => Ok(BackendOp::Set {
                    field,
                    value: Document::from_map(fields.clone()),
                }),
                _ => Err(Error::InvalidDocument(format!(
                    "{} of \"{}\" must carry a document",
                    patch.op, field
                ))),
            },
            PatchOp::Remove => Ok(BackendOp::Del { field }),
        },
    }
}

/// Translate a batch, failing on the first invalid path
pub fn to_backend_ops(patches: &[AddressablePatch]) -> Result<Vec<BackendOp>> {
    patches.iter().map(to_backend_op).collect()
}
