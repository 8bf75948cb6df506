//! Patch representations
//!
//! Three shapes describe the same edits at different layers:
//!
//! | Type | Path | Produced by |
//! |------|------|-------------|
//! | [`Patch`] | segment list `[id, field, ...]` | the structural diff |
//! | [`AddressablePatch`] | `/`-joined string `id/field/...` | translation for consumers |
//! | [`BackendOp`] | backend field + optional sub-patch | translation for persistence |
//!
//! Addressable paths escape `~` as `~0` and `/` as `~1` inside a segment
//! (RFC 6901), so every path parses back into the segments it was built
//! from. Keys without those characters are written verbatim.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::json::{add_at_path, delete_at_path, replace_at_path};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Kind of structural edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Value added where nothing existed
    Add,
    /// Existing value overwritten
    Replace,
    /// Value removed
    Remove,
}

impl PatchOp {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Replace => "replace",
            PatchOp::Remove => "remove",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(PatchOp::Add),
            "replace" => Ok(PatchOp::Replace),
            "remove" => Ok(PatchOp::Remove),
            other => Err(Error::UnknownOp(other.to_string())),
        }
    }
}

/// One edit to a tree, addressed by path segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Edit kind
    pub op: PatchOp,
    /// Segments from the root; the first is a document id at collection level
    pub path: Vec<String>,
    /// New value for add/replace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    /// Create an add patch
    pub fn add(path: Vec<String>, value: Value) -> Self {
        Patch {
            op: PatchOp::Add,
            path,
            value: Some(value),
        }
    }

    /// Create a replace patch
    pub fn replace(path: Vec<String>, value: Value) -> Self {
        Patch {
            op: PatchOp::Replace,
            path,
            value: Some(value),
        }
    }

    /// Create a remove patch
    pub fn remove(path: Vec<String>) -> Self {
        Patch {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }

    /// Document id this patch addresses (first segment)
    pub fn doc_id(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// Top-level document field this patch addresses (second segment)
    pub fn field(&self) -> Option<&str> {
        self.path.get(1).map(String::as_str)
    }

    /// Apply this edit to `root`
    ///
    /// Add and replace without a value write `null`.
    pub fn apply(&self, root: &mut Value) -> Result<()> {
        let value = self.value.clone().unwrap_or(Value::Null);
        match self.op {
            PatchOp::Add => add_at_path(root, &self.path, value)?,
            PatchOp::Replace => replace_at_path(root, &self.path, value)?,
            PatchOp::Remove => {
                delete_at_path(root, &self.path)?;
            }
        }
        Ok(())
    }

    /// Convert to the `/`-joined form
    pub fn to_addressable(&self) -> AddressablePatch {
        AddressablePatch {
            op: self.op,
            path: join_path(&self.path),
            value: self.value.clone(),
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} [{}] = {}", self.op, self.path.join(", "), value),
            None => write!(f, "{} [{}]", self.op, self.path.join(", ")),
        }
    }
}

/// Apply patches in order
///
/// If any patch fails, `root` may be left partially modified.
pub fn apply_patches(root: &mut Value, patches: &[Patch]) -> Result<()> {
    for patch in patches {
        patch.apply(root)?;
    }
    Ok(())
}

/// Structural patch with its path flattened to a delimited string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressablePatch {
    /// Edit kind
    pub op: PatchOp,
    /// Escaped segments joined with `/`
    pub path: String,
    /// New value for add/replace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl AddressablePatch {
    /// Create an addressable patch
    pub fn new(op: PatchOp, path: impl Into<String>, value: Option<Value>) -> Self {
        AddressablePatch {
            op,
            path: path.into(),
            value,
        }
    }

    /// Split back into path segments
    pub fn to_structural(&self) -> Patch {
        Patch {
            op: self.op,
            path: split_path(&self.path),
            value: self.value.clone(),
        }
    }
}

impl From<&Patch> for AddressablePatch {
    fn from(patch: &Patch) -> Self {
        patch.to_addressable()
    }
}

/// Escape one path segment
pub fn escape_segment(segment: &str) -> String {
    if segment.contains(['~', '/']) {
        segment.replace('~', "~0").replace('/', "~1")
    } else {
        segment.to_string()
    }
}

/// Reverse [`escape_segment`]
pub fn unescape_segment(segment: &str) -> String {
    if segment.contains('~') {
        segment.replace("~1", "/").replace("~0", "~")
    } else {
        segment.to_string()
    }
}

/// Join segments into an addressable path
pub fn join_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| escape_segment(s))
        .collect::<Vec<_>>()
        .join("/")
}

/// Split an addressable path into segments
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/').map(unescape_segment).collect()
}

/// Kind of backend write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOpKind {
    /// Overwrite a whole document
    Set,
    /// Delete a whole document
    Del,
    /// Apply one structural edit inside a stored document
    Patch,
}

impl BackendOpKind {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendOpKind::Set => "set",
            BackendOpKind::Del => "del",
            BackendOpKind::Patch => "patch",
        }
    }
}

impl FromStr for BackendOpKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "set" => Ok(BackendOpKind::Set),
            "del" => Ok(BackendOpKind::Del),
            "patch" => Ok(BackendOpKind::Patch),
            other => Err(Error::UnknownOp(other.to_string())),
        }
    }
}

impl fmt::Display for BackendOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-scoped persistence instruction
///
/// Serializes as `{"op": "set"|"del"|"patch", "field": ..., ...}`. Decoding
/// goes through [`BackendOp::from_value`], which reports unrecognized op
/// names as [`Error::UnknownOp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase", try_from = "Value")]
pub enum BackendOp {
    /// Overwrite the whole document stored under `field`
    Set {
        /// Backend field (document id)
        field: String,
        /// Document to store
        value: Document,
    },
    /// Delete the document stored under `field`
    Del {
        /// Backend field (document id)
        field: String,
    },
    /// Apply one edit to the document stored under `field`
    Patch {
        /// Backend field (document id)
        field: String,
        /// Edit relative to the document root; `None` is a malformed op
        #[serde(default, skip_serializing_if = "Option::is_none")]
        patch: Option<AddressablePatch>,
    },
}

impl BackendOp {
    /// Backend field this op writes
    pub fn field(&self) -> &str {
        match self {
            BackendOp::Set { field, .. }
            | BackendOp::Del { field }
            | BackendOp::Patch { field, .. } => field,
        }
    }

    /// Operation kind
    pub fn kind(&self) -> BackendOpKind {
        match self {
            BackendOp::Set { .. } => BackendOpKind::Set,
            BackendOp::Del { .. } => BackendOpKind::Del,
            BackendOp::Patch { .. } => BackendOpKind::Patch,
        }
    }

    /// Decode the wire shape
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(Error::Serialization("backend op must be an object".into()));
        };
        let kind: BackendOpKind = match obj.get("op") {
            Some(Value::String(op)) => op.parse()?,
            Some(other) => return Err(Error::UnknownOp(other.to_string())),
            None => return Err(Error::UnknownOp(String::new())),
        };
        let field = match obj.remove("field") {
            Some(Value::String(field)) => field,
            _ => return Err(Error::Serialization("backend op needs a string field".into())),
        };
        match kind {
            BackendOpKind::Set => {
                let value = obj.remove("value").ok_or_else(|| {
                    Error::Serialization(format!("set op for \"{}\" has no value", field))
                })?;
                let Value::Object(fields) = value else {
                    return Err(Error::InvalidDocument(format!(
                        "set op for \"{}\" carries a non-object value",
                        field
                    )));
                };
                Ok(BackendOp::Set {
                    field,
                    value: Document::from_map(fields),
                })
            }
            BackendOpKind::Del => Ok(BackendOp::Del { field }),
            BackendOpKind::Patch => {
                let patch = match obj.remove("patch") {
                    Some(Value::Null) | None => None,
                    Some(raw) => Some(serde_json::from_value(raw)?),
                };
                Ok(BackendOp::Patch { field, patch })
            }
        }
    }
}

impl TryFrom<Value> for BackendOp {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        BackendOp::from_value(value)
    }
}
