//! Document type
//!
//! A [`Document`] is a JSON object with one required string field, the
//! identity key [`ID_KEY`]. It is a newtype around `serde_json::Map`
//! providing:
//! - Direct access to the underlying map via Deref/DerefMut
//! - Validated construction from arbitrary JSON values
//! - Compact JSON encoding, the wire form stored in the backend
//!
//! # Examples
//!
//! ```
//! use evig_core::Document;
//! use serde_json::json;
//!
//! let mut doc = Document::new("42");
//! doc.set("name", "Alice");
//! assert_eq!(doc.id(), Some("42"));
//! assert_eq!(doc.get("name"), Some(&json!("Alice")));
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Name of the identity field every document carries
pub const ID_KEY: &str = "id";

/// JSON document with an identity key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create `{ "id": id }`
    pub fn new(id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ID_KEY.to_string(), Value::String(id.into()));
        Document(fields)
    }

    /// Wrap a map without checking the identity field
    ///
    /// Used for pruned projections and for values read back from the
    /// backend; [`Document::try_from`] is the validating constructor.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Document(fields)
    }

    /// The identity value, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_KEY).and_then(Value::as_str)
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Numeric field as i64, or 0 when missing or not an integer
    pub fn get_i64(&self, field: &str) -> i64 {
        self.0.get(field).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the underlying map
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Consume into the underlying map
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consume into a `serde_json::Value::Object`
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Clone into a `serde_json::Value::Object`
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Check that the identity field is a non-empty string
    pub fn validate(&self) -> Result<&str> {
        match self.0.get(ID_KEY) {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.as_str()),
            Some(Value::String(_)) => Err(Error::InvalidDocument("empty id".to_string())),
            Some(other) => Err(Error::InvalidDocument(format!(
                "id must be a string, found {}",
                crate::json::value_type_name(other)
            ))),
            None => Err(Error::InvalidDocument("missing id".to_string())),
        }
    }

    /// Serialize to the compact JSON text stored in the backend
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parse the backend's JSON text
    ///
    /// The stored text must be an object; the identity field is not
    /// checked here because the backend field name is authoritative.
    pub fn decode(text: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Document(fields)),
            other => Err(Error::InvalidDocument(format!(
                "stored document is {}, expected object",
                crate::json::value_type_name(&other)
            ))),
        }
    }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => {
                let doc = Document(fields);
                doc.validate()?;
                Ok(doc)
            }
            other => Err(Error::InvalidDocument(format!(
                "expected object, found {}",
                crate::json::value_type_name(&other)
            ))),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl Deref for Document {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}
