//! Structural-diff engine
//!
//! `produce` hands a mutable draft to a recipe and returns the resulting
//! value together with the ordered patch list that turns the prior value
//! into it. The prior value is never touched.
//!
//! Patches are derived by diffing the prior value against the draft once
//! the recipe returns. At every map level:
//!
//! 1. keys of the new map, in its order: absent before -> `add`, plain
//!    objects on both sides -> recurse, otherwise unequal -> `replace`
//! 2. keys only in the old map, in its order -> `remove`
//!
//! Equal values produce nothing. Arrays are leaves.

use evig_core::{Patch, Result};
use serde_json::{Map, Value};

/// Run `recipe` against a draft of `state`
///
/// Returns the new value and the patches leading to it. If the recipe
/// fails the draft is discarded.
pub fn produce<F>(state: &Value, recipe: F) -> Result<(Value, Vec<Patch>)>
where
    F: FnOnce(&mut Value) -> Result<()>,
{
    let mut draft = state.clone();
    recipe(&mut draft)?;
    let mut patches = Vec::new();
    diff_values(state, &draft, &mut Vec::new(), &mut patches);
    Ok((draft, patches))
}

/// Append the patches turning `base` into `next` at `path`
pub fn diff_values(base: &Value, next: &Value, path: &mut Vec<String>, out: &mut Vec<Patch>) {
    match (base, next) {
        (Value::Object(base), Value::Object(next)) => diff_maps(base, next, path, out),
        _ if base != next => out.push(Patch::replace(path.clone(), next.clone())),
        _ => {}
    }
}

/// Map-level diff; see the module docs for ordering
pub fn diff_maps(
    base: &Map<String, Value>,
    next: &Map<String, Value>,
    path: &mut Vec<String>,
    out: &mut Vec<Patch>,
) {
    for (key, value) in next {
        path.push(key.clone());
        match (base.get(key), value) {
            (None, _) => out.push(Patch::add(path.clone(), value.clone())),
            (Some(Value::Object(old)), Value::Object(new)) => diff_maps(old, new, path, out),
            (Some(old), _) if old != value => {
                out.push(Patch::replace(path.clone(), value.clone()))
            }
            _ => {}
        }
        path.pop();
    }
    for key in base.keys() {
        if !next.contains_key(key) {
            path.push(key.clone());
            out.push(Patch::remove(path.clone()));
            path.pop();
        }
    }
}
