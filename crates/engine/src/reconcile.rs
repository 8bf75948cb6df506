//! Minimal-diff reconciliation
//!
//! [`reconcile`] edits a plain object tree in place until it deep-equals a
//! target, touching only what differs: nested plain objects present on
//! both sides are recursed into, every other differing value is
//! overwritten, and keys missing from the target are dropped.
//!
//! The edited tree takes the target's key order. Running it inside
//! [`crate::produce`] therefore yields patches in this order:
//!
//! | Step | Patches                                             |
//! |------|-----------------------------------------------------|
//! | 1    | added / replaced keys, target order, depth-first    |
//! | 2    | removed keys, source order                          |

use serde_json::{Map, Value};

/// Make `source` deep-equal `target` with the fewest edits
pub fn reconcile(source: &mut Map<String, Value>, target: &Map<String, Value>) {
    let mut previous = std::mem::take(source);
    for (key, wanted) in target {
        let value = match (previous.swap_remove(key), wanted) {
            (Some(Value::Object(mut existing)), Value::Object(wanted)) => {
                reconcile(&mut existing, wanted);
                Value::Object(existing)
            }
            (Some(existing), wanted) if existing == *wanted => existing,
            (_, wanted) => wanted.clone(),
        };
        source.insert(key.clone(), value);
    }
}

/// [`reconcile`] on arbitrary values
///
/// Anything other than two plain objects is a plain overwrite.
pub fn reconcile_value(source: &mut Value, target: &Value) {
    match (source, target) {
        (Value::Object(source), Value::Object(target)) => reconcile(source, target),
        (source, target) => {
            if *source != *target {
                *source = target.clone();
            }
        }
    }
}
