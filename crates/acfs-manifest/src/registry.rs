//! # Checksum Registry Document
//!
//! Loads `checksums.yaml`:
//!
//! ```yaml
//! installers:
//!   bun:
//!     url: https://bun.sh/install
//!     sha256: 0123...cdef
//! ```
//!
//! Entries are kept raw (both fields optional) so that an incomplete entry
//! is reported by the security gate with every other gap, instead of
//! failing the load on the first one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ParseError, RegistryError};
use crate::parser::parse_yaml;

/// One registry entry as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryEntry {
    /// Source URL of the installer script.
    #[serde(default)]
    pub url: Option<String>,
    /// Expected SHA-256 of the script body.
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    installers: BTreeMap<String, RegistryEntry>,
}

/// Read-only mapping from tool key to installer source and hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl ChecksumRegistry {
    /// Build a registry directly from entries. Used by tests and fixtures.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, RegistryEntry)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Parse registry source text.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Parse` for malformed YAML or an unexpected shape.
    pub fn parse(source: &str) -> Result<Self, RegistryError> {
        let value = parse_yaml(source)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        let doc: RegistryDocument = serde_json::from_value(value).map_err(|e| ParseError {
            message: e.to_string(),
            line: None,
            column: None,
        })?;
        Ok(Self {
            entries: doc.installers,
        })
    }

    /// Read and parse the registry file.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Missing` when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let source = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                RegistryError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let registry = Self::parse(&source)?;
        tracing::debug!(path = %path.display(), entries = registry.len(), "loaded checksum registry");
        Ok(registry)
    }

    /// Look up an entry by tool key.
    pub fn get(&self, tool: &str) -> Option<&RegistryEntry> {
        self.entries.get(tool)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
