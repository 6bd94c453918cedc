//! # Compiler Configuration
//!
//! An optional YAML file given by `--config`:
//!
//! ```yaml
//! manifest: acfs.manifest.yaml
//! checksums: checksums.yaml
//! output_dir: scripts/generated
//! ```
//!
//! Every field is optional and relative to the repository root. A flag on
//! the command line wins over the file, and the file wins over the fixed
//! default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{resolve_path, CHECKSUMS_FILE, MANIFEST_FILE, OUTPUT_DIR};

/// Contents of a compiler configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Manifest path.
    pub manifest: Option<PathBuf>,
    /// Checksum registry path.
    pub checksums: Option<PathBuf>,
    /// Directory the generated scripts are written to.
    pub output_dir: Option<PathBuf>,
}

impl CompilerConfig {
    /// Parse configuration text. An empty document is the default config.
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(source).context("invalid compiler configuration")
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("in {}", path.display()))
    }
}

/// Paths given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub manifest: Option<PathBuf>,
    pub checksums: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Fully resolved input and output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilePaths {
    pub manifest: PathBuf,
    pub checksums: PathBuf,
    pub output_dir: PathBuf,
}

impl CompilePaths {
    /// Apply flag > config > default precedence, then anchor relative paths
    /// at `repo_root`.
    pub fn resolve(repo_root: &Path, config: &CompilerConfig, flags: &PathOverrides) -> Self {
        let pick = |flag: &Option<PathBuf>, file: &Option<PathBuf>, default: &str| {
            let chosen = flag
                .clone()
                .or_else(|| file.clone())
                .unwrap_or_else(|| PathBuf::from(default));
            resolve_path(&chosen, repo_root)
        };
        Self {
            manifest: pick(&flags.manifest, &config.manifest, MANIFEST_FILE),
            checksums: pick(&flags.checksums, &config.checksums, CHECKSUMS_FILE),
            output_dir: pick(&flags.output_dir, &config.output_dir, OUTPUT_DIR),
        }
    }
}
