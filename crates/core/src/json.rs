//! Path operations on JSON values
//!
//! Paths are sequences of string segments. A segment addresses an object
//! key, or an array element when the parent is an array (the segment is
//! then parsed as an index, and `-` means "one past the end").
//!
//! These are the primitives structural patches are applied with:
//! - [`get_at_path`] / [`get_at_path_mut`]: traversal
//! - [`add_at_path`]: insert (arrays shift), the `add` op
//! - [`replace_at_path`]: overwrite in place, the `replace` op
//! - [`delete_at_path`]: removal, the `remove` op
//!
//! Intermediate containers are never created: a missing parent is an error,
//! because a well-formed patch sequence always creates parents first.

use serde_json::Value;
use thiserror::Error;

/// Error type for path operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Type mismatch during path traversal
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type
        expected: &'static str,
        /// Actual type found
        found: &'static str,
    },

    /// Array index out of bounds
    #[error("index out of bounds: {index} > {len}")]
    IndexOutOfBounds {
        /// The requested index
        index: usize,
        /// The array length
        len: usize,
    },

    /// Segment is not a valid array index
    #[error("invalid array index: {0}")]
    InvalidIndex(String),

    /// Path not found
    #[error("path not found")]
    NotFound,
}

/// True for values the diff algorithms recurse into.
///
/// Only maps qualify; arrays and scalars are treated as leaves.
#[inline]
pub fn is_plain_object(value: &Value) -> bool {
    value.is_object()
}

/// Get value at path within a JSON value
///
/// Returns `None` if the path doesn't exist or crosses a scalar.
pub fn get_at_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Get mutable reference to value at path within a JSON value
pub fn get_at_path_mut<'a>(value: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path {
        current = child_mut(current, segment)?;
    }
    Some(current)
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(obj) => obj.get_mut(segment),
        Value::Array(arr) => arr.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn parent_of<'a>(
    root: &'a mut Value,
    path: &'a [String],
) -> Result<(&'a mut Value, &'a String), PathError> {
    let (last, parent_path) = path.split_last().ok_or(PathError::NotFound)?;
    let parent = get_at_path_mut(root, parent_path).ok_or(PathError::NotFound)?;
    Ok((parent, last))
}

fn array_index(segment: &str, len: usize) -> Result<usize, PathError> {
    if segment == "-" {
        return Ok(len);
    }
    segment
        .parse::<usize>()
        .map_err(|_| PathError::InvalidIndex(segment.to_string()))
}

/// Insert `value` at `path`
///
/// On objects the key is inserted or overwritten. On arrays the element is
/// inserted before `index`, shifting the rest. An empty path replaces the
/// root.
pub fn add_at_path(root: &mut Value, path: &[String], value: Value) -> Result<(), PathError> {
    if path.is_empty() {
        *root = value;
        return Ok(());
    }
    let (parent, last) = parent_of(root, path)?;
    match parent {
        Value::Object(obj) => {
            obj.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(arr) => {
            let idx = array_index(last, arr.len())?;
            if idx > arr.len() {
                return Err(PathError::IndexOutOfBounds {
                    index: idx,
                    len: arr.len(),
                });
            }
            arr.insert(idx, value);
            Ok(())
        }
        other => Err(PathError::TypeMismatch {
            expected: "object or array",
            found: value_type_name(other),
        }),
    }
}

/// Overwrite the value at `path`
///
/// Object keys are set whether or not they existed. Array elements must
/// already exist. An empty path replaces the root.
pub fn replace_at_path(root: &mut Value, path: &[String], value: Value) -> Result<(), PathError> {
    if path.is_empty() {
        *root = value;
        return Ok(());
    }
    let (parent, last) = parent_of(root, path)?;
    match parent {
        Value::Object(obj) => {
            obj.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(arr) => {
            let idx = array_index(last, arr.len())?;
            match arr.get_mut(idx) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(PathError::IndexOutOfBounds {
                    index: idx,
                    len: arr.len(),
                }),
            }
        }
        other => Err(PathError::TypeMismatch {
            expected: "object or array",
            found: value_type_name(other),
        }),
    }
}

/// Delete value at path within a JSON value
///
/// Returns the removed value, or `None` if nothing was there. Deleting the
/// root replaces it with null.
pub fn delete_at_path(root: &mut Value, path: &[String]) -> Result<Option<Value>, PathError> {
    if path.is_empty() {
        return Ok(Some(std::mem::take(root)));
    }
    let (parent, last) = parent_of(root, path)?;
    match parent {
        Value::Object(obj) => Ok(obj.shift_remove(last)),
        Value::Array(arr) => {
            let idx = array_index(last, arr.len())?;
            if idx < arr.len() {
                Ok(Some(arr.remove(idx)))
            } else {
                Ok(None)
            }
        }
        other => Err(PathError::TypeMismatch {
            expected: "object or array",
            found: value_type_name(other),
        }),
    }
}

/// Helper to get type name for error messages
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
