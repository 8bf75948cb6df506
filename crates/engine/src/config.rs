//! Store configuration via `evig.toml`
//!
//! Holds the storage key prefix and named view definitions. A default file
//! is written on first use; edit it and restart to change settings.
//!
//! [`CollectionOptions`] and [`ViewOptions`] are the programmatic forms and
//! can be derived from a loaded [`EvigConfig`].

use evig_core::{Document, Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "evig.toml";

/// Storage key prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "evig_";

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Field selection for one named view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewConfig {
    /// Fields kept in the projection; empty keeps every field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_fields: Vec<String>,
    /// Fields dropped from the projection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_fields: Vec<String>,
}

/// Store configuration loaded from `evig.toml`.
///
/// # Example
///
/// ```toml
/// prefix = "evig_"
///
/// [views.public]
/// excluded_fields = ["secret"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvigConfig {
    /// Prepended to a collection name to form its storage key.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Named view definitions.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub views: IndexMap<String, ViewConfig>,
}

impl Default for EvigConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            views: IndexMap::new(),
        }
    }
}

impl EvigConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# evig configuration
#
# Storage key prefix. A collection named "users" is stored under
# "<prefix>users" in the backend.
prefix = "evig_"

# Named views. Each view keeps the included fields (all fields when the
# list is empty), then drops the excluded ones. "id" is always kept.
# [views.public]
# included_fields = []
# excluded_fields = ["secret"]
"#
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Options for collections opened under this config
    pub fn collection_options(&self) -> CollectionOptions {
        CollectionOptions {
            prefix: self.prefix.clone(),
        }
    }

    /// Options for the named view, if defined
    pub fn view_options(&self, name: &str) -> Option<ViewOptions> {
        self.views.get(name).map(|view| {
            ViewOptions::new()
                .include(view.included_fields.iter().cloned())
                .exclude(view.excluded_fields.iter().cloned())
        })
    }
}

/// Programmatic collection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Storage key prefix
    pub prefix: String,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

impl CollectionOptions {
    /// Override the prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Predicate deciding whether a document appears in a view
pub type Filter = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Programmatic view settings
#[derive(Clone, Default)]
pub struct ViewOptions {
    /// Fields kept in the projection; empty keeps every field
    pub included_fields: Vec<String>,
    /// Fields dropped from the projection
    pub excluded_fields: Vec<String>,
    /// Documents failing the predicate are left out
    pub filter: Option<Filter>,
}

impl ViewOptions {
    /// No restriction, no filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add fields to the include list
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add fields to the exclude list
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Set the document predicate
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl std::fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewOptions")
            .field("included_fields", &self.included_fields)
            .field("excluded_fields", &self.excluded_fields)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
