//! # Security Gate
//!
//! Every verified installer in the manifest must resolve to a registry entry
//! with an `https://` URL and a well-formed SHA-256. The gate checks this
//! before any artifact exists and hands back a [`CoveredRegistry`], the only
//! registry type the emitter accepts.
//!
//! There is no unverified path: a gap fails the whole compilation with the
//! full list of uncovered keys.

use std::collections::BTreeMap;
use std::path::Path;

use acfs_core::{digest::is_valid_sha256, ModuleId, Sha256Hex, ToolKey};
use acfs_manifest::{ChecksumRegistry, Manifest, RegistryEntry};

use crate::error::{CoverageGap, GapReason, SecurityCoverageError};

/// Registry data for one tool that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSource {
    /// `https://` URL of the installer script.
    pub url: String,
    /// Expected SHA-256 of the script.
    pub sha256: Sha256Hex,
}

/// Registry entries for exactly the tools the manifest references, each
/// known to be complete.
///
/// Only constructed by [`check_coverage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoveredRegistry {
    sources: BTreeMap<ToolKey, VerifiedSource>,
}

impl CoveredRegistry {
    /// Verified source for a tool key.
    pub fn source(&self, tool: &ToolKey) -> Option<&VerifiedSource> {
        self.sources.get(tool)
    }

    /// Number of covered tools.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True if the manifest references no verified installer.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Tool keys referenced by verified installers, with their modules in
/// manifest order.
fn referenced_tools(manifest: &Manifest) -> BTreeMap<ToolKey, Vec<ModuleId>> {
    let mut tools: BTreeMap<ToolKey, Vec<ModuleId>> = BTreeMap::new();
    for module in &manifest.modules {
        if let Some(installer) = &module.verified_installer {
            tools
                .entry(installer.tool.clone())
                .or_default()
                .push(module.id.clone());
        }
    }
    tools
}

fn entry_gaps(entry: Option<&RegistryEntry>) -> Vec<GapReason> {
    let Some(entry) = entry else {
        return vec![GapReason::MissingEntry];
    };
    let mut reasons = Vec::new();
    match entry.url.as_deref().map(str::trim) {
        None | Some("") => reasons.push(GapReason::MissingUrl),
        Some(url) if !url.starts_with("https://") || url.len() == "https://".len() => {
            reasons.push(GapReason::InsecureUrl)
        }
        Some(url) if url.contains(char::is_whitespace) => reasons.push(GapReason::InsecureUrl),
        Some(_) => {}
    }
    match entry.sha256.as_deref() {
        None | Some("") => reasons.push(GapReason::MissingSha256),
        Some(sha) if !is_valid_sha256(sha) => reasons.push(GapReason::MalformedSha256),
        Some(_) => {}
    }
    reasons
}

/// Check that `registry` covers every verified installer in `manifest`.
///
/// # Errors
///
/// Returns [`SecurityCoverageError::Incomplete`] listing every uncovered key.
pub fn check_coverage(
    manifest: &Manifest,
    registry: &ChecksumRegistry,
) -> Result<CoveredRegistry, SecurityCoverageError> {
    let mut gaps = Vec::new();
    let mut sources = BTreeMap::new();

    for (tool, modules) in referenced_tools(manifest) {
        let entry = registry.get(tool.as_str());
        let reasons = entry_gaps(entry);
        if !reasons.is_empty() {
            gaps.push(CoverageGap {
                tool,
                modules,
                reasons,
            });
            continue;
        }
        let (Some(url), Some(sha)) = (
            entry.and_then(|e| e.url.as_deref()),
            entry.and_then(|e| e.sha256.as_deref()),
        ) else {
            continue;
        };
        match Sha256Hex::parse(sha) {
            Ok(sha256) => {
                sources.insert(
                    tool,
                    VerifiedSource {
                        url: url.trim().to_string(),
                        sha256,
                    },
                );
            }
            Err(_) => gaps.push(CoverageGap {
                tool,
                modules,
                reasons: vec![GapReason::MalformedSha256],
            }),
        }
    }

    if !gaps.is_empty() {
        tracing::warn!(uncovered = gaps.len(), "checksum registry coverage incomplete");
        return Err(SecurityCoverageError::Incomplete { gaps });
    }
    tracing::debug!(tools = sources.len(), "checksum registry covers every verified installer");
    Ok(CoveredRegistry { sources })
}

/// The error for a registry document that does not exist. Fatal whether or
/// not the manifest references any verified installer.
pub fn missing_registry(manifest: &Manifest, path: &Path) -> SecurityCoverageError {
    SecurityCoverageError::RegistryMissing {
        path: path.to_path_buf(),
        referenced: referenced_tools(manifest).into_keys().collect(),
    }
}
