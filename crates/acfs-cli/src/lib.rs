//! # acfs-cli: Compiler Driver
//!
//! Provides the `acfs-manifest` binary. One invocation runs the whole
//! pipeline: load and schema-check the manifest, validate and sequence the
//! dependency graph, gate checksum coverage, render every artifact, then
//! act on the selected mode.
//!
//! ```bash
//! acfs-manifest              # regenerate scripts/generated/
//! acfs-manifest --dry-run -v # list what would be written, with previews
//! acfs-manifest --validate   # run every check, write nothing
//! acfs-manifest --diff       # exit 1 if scripts/generated/ is out of date
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | manifest, graph or coverage violation, or `--diff` found a difference |
//! | 2 | operational failure: I/O, configuration, write |

pub mod compile;
pub mod config;
pub mod output;

use std::path::{Path, PathBuf};

/// Manifest location relative to the repository root.
pub const MANIFEST_FILE: &str = "acfs.manifest.yaml";
/// Checksum registry location relative to the repository root.
pub const CHECKSUMS_FILE: &str = "checksums.yaml";
/// Output directory relative to the repository root.
pub const OUTPUT_DIR: &str = "scripts/generated";

/// Resolve a path that may be relative to the repository root.
///
/// Absolute paths are returned as-is; relative ones are joined onto
/// `repo_root`.
pub fn resolve_path(path: &Path, repo_root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

/// Walk up from `start` to the first directory containing the manifest.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(MANIFEST_FILE).is_file() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}
