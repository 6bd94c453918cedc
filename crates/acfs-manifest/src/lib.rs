//! # acfs-manifest: Manifest Model & Schema Validation
//!
//! Turns raw manifest text into a fully typed [`Manifest`].
//!
//! ## Pipeline
//!
//! 1. [`parser::parse_yaml`]: YAML text to a JSON value. Syntax errors become
//!    a [`ParseError`] with line and column when available.
//! 2. [`schema::ManifestValidator::validate`]: shape checks against the
//!    embedded `manifest.schema.json`, plus cross-field refinements. Every
//!    violation is collected into [`SchemaErrors`]; nothing stops at the
//!    first error.
//! 3. Typed deserialization into [`Manifest`].
//!
//! The checksum registry document is loaded by [`registry`]; deciding whether
//! it covers the manifest is the security gate's job, not this crate's.
//!
//! ## Crate Policy
//!
//! - Depends only on `acfs-core` internally.
//! - Validation is pure: no filesystem access outside [`load`] and
//!   [`registry::ChecksumRegistry::load`].
//! - Schema validation is a trust boundary. Nothing downstream sees
//!   manifest content that did not pass it.

pub mod error;
pub mod model;
pub mod parser;
pub mod registry;
pub mod schema;

use std::path::Path;

use acfs_core::ContentDigest;

pub use error::{ManifestError, ParseError, RegistryError, SchemaError, SchemaErrors};
pub use model::{
    Defaults, InstalledCheck, Manifest, Mode, Module, RunAs, Runner, VerifiedInstaller,
    DEFAULT_PHASE, MAX_PHASE, MIN_PHASE,
};
pub use registry::{ChecksumRegistry, RegistryEntry};
pub use schema::ManifestValidator;

/// A manifest that passed schema validation together with the digest of the
/// exact source bytes it was parsed from.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// The typed manifest.
    pub manifest: Manifest,
    /// SHA-256 of the source text, carried into the manifest index.
    pub source_digest: ContentDigest,
}

/// Parse and validate manifest source text.
pub fn load_str(source: &str) -> Result<LoadedManifest, ManifestError> {
    let value = parser::parse_yaml(source)?;
    let manifest = ManifestValidator::new()?.validate(&value)?;
    Ok(LoadedManifest {
        manifest,
        source_digest: ContentDigest::sha256(source.as_bytes()),
    })
}

/// Read, parse and validate a manifest file.
pub fn load(path: &Path) -> Result<LoadedManifest, ManifestError> {
    let source = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = source.len(), "read manifest");
    load_str(&source)
}
