//! Manifest error types.
//!
//! `ParseError` covers malformed YAML. `SchemaErrors` is the collected set of
//! every shape or refinement violation found in one pass, each addressed by
//! a dotted field path (`modules.<id>.phase`).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed manifest or registry source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{}", position_suffix(.line, .column))]
pub struct ParseError {
    /// The parser's description of the problem.
    pub message: String,
    /// 1-based line, when the parser reported one.
    pub line: Option<usize>,
    /// 1-based column, when the parser reported one.
    pub column: Option<usize>,
}

fn position_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(l), Some(c)) => format!(" (line {l}, column {c})"),
        (Some(l), None) => format!(" (line {l})"),
        _ => String::new(),
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        let location = err.location();
        Self {
            message: err.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    }
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// Dotted path to the violating field; empty for the document root.
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl SchemaError {
    /// Create a violation at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every schema violation found in a manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} schema violation(s):\n{}", .errors.len(), render_lines(.errors))]
pub struct SchemaErrors {
    errors: Vec<SchemaError>,
}

fn render_lines(items: &[SchemaError]) -> String {
    items
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl SchemaErrors {
    /// Wrap a non-empty set of violations.
    pub fn new(errors: Vec<SchemaError>) -> Self {
        Self { errors }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// True if some violation sits at exactly `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

/// Error loading the checksum registry document.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The registry file does not exist.
    #[error("checksum registry not found: {path}")]
    Missing {
        /// Expected registry location.
        path: PathBuf,
    },

    /// The registry file exists but could not be read.
    #[error("failed to read checksum registry {path}: {source}")]
    Io {
        /// Registry location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The registry is not well-formed YAML of the expected shape.
    #[error("malformed checksum registry: {0}")]
    Parse(#[from] ParseError),
}

/// Error loading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Manifest location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Malformed YAML.
    #[error("manifest parse error: {0}")]
    Parse(#[from] ParseError),

    /// Well-formed YAML with an invalid shape.
    #[error("manifest {0}")]
    Schema(#[from] SchemaErrors),

    /// The embedded schema failed to compile. Indicates a broken build.
    #[error("embedded manifest schema is invalid: {0}")]
    SchemaBuild(String),
}
