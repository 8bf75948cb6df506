//! Patch expansion
//!
//! Rewrites an add/replace whose value is a plain object into leaf-level
//! patches: first the op itself with an empty object, then one `add` per
//! key, expanded recursively. Consumers that track individual fields (such
//! as views pruning excluded fields) never see a composite value.
//!
//! ```text
//! replace [1, n] = {"a": 1, "b": {"c": 2}}
//!   =>
//! replace [1, n]       = {}
//! add     [1, n, a]    = 1
//! add     [1, n, b]    = {}
//! add     [1, n, b, c] = 2
//! ```

use evig_core::{Patch, PatchOp};
use serde_json::{Map, Value};

/// Expand one patch; non-object values come back unchanged
pub fn expand_patch(patch: &Patch) -> Vec<Patch> {
    let mut out = Vec::new();
    expand_into(patch, &mut out);
    out
}

/// Expand every patch in order
pub fn expand_patches(patches: &[Patch]) -> Vec<Patch> {
    let mut out = Vec::with_capacity(patches.len());
    for patch in patches {
        expand_into(patch, &mut out);
    }
    out
}

fn expand_into(patch: &Patch, out: &mut Vec<Patch>) {
    match (&patch.op, &patch.value) {
        (PatchOp::Add | PatchOp::Replace, Some(Value::Object(fields))) => {
            out.push(Patch {
                op: patch.op,
                path: patch.path.clone(),
                value: Some(Value::Object(Map::new())),
            });
            let mut path = patch.path.clone();
            for (key, value) in fields {
                path.push(key.clone());
                expand_into(&Patch::add(path.clone(), value.clone()), out);
                path.pop();
            }
        }
        _ => out.push(patch.clone()),
    }
}
