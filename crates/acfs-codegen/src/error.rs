//! Error types for the security gate and the emitter.

use std::fmt;
use std::path::PathBuf;

use acfs_core::{ModuleId, ToolKey};
use thiserror::Error;

/// What is wrong with one tool's registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReason {
    /// No entry for the tool key.
    MissingEntry,
    /// Entry has no URL, or an empty one.
    MissingUrl,
    /// URL is not `https://`.
    InsecureUrl,
    /// Entry has no sha256, or an empty one.
    MissingSha256,
    /// sha256 is not 64 lowercase hex characters.
    MalformedSha256,
}

impl GapReason {
    /// Human-readable description.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingEntry => "no registry entry",
            Self::MissingUrl => "url missing",
            Self::InsecureUrl => "url is not https://",
            Self::MissingSha256 => "sha256 missing",
            Self::MalformedSha256 => "sha256 is not 64 lowercase hex characters",
        }
    }
}

/// A tool key the registry does not cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageGap {
    /// Registry key referenced by a verified installer.
    pub tool: ToolKey,
    /// Modules referencing the key, in manifest order.
    pub modules: Vec<ModuleId>,
    /// Every problem found with the entry.
    pub reasons: Vec<GapReason>,
}

impl fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<&str> = self.reasons.iter().map(GapReason::as_str).collect();
        let modules: Vec<&str> = self.modules.iter().map(ModuleId::as_str).collect();
        write!(
            f,
            "{}: {} (used by {})",
            self.tool,
            reasons.join(", "),
            modules.join(", ")
        )
    }
}

/// The checksum registry cannot vouch for every verified installer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityCoverageError {
    /// The registry document does not exist.
    #[error(
        "checksum registry not found at {}; refusing to generate installers{}",
        .path.display(),
        referenced_suffix(.referenced)
    )]
    RegistryMissing {
        /// Expected registry location.
        path: PathBuf,
        /// Tool keys the manifest references.
        referenced: Vec<ToolKey>,
    },

    /// One or more referenced tool keys are missing or incomplete.
    #[error("checksum registry does not cover {} tool(s):\n{}", .gaps.len(), render_gaps(.gaps))]
    Incomplete {
        /// Every uncovered key, sorted by key.
        gaps: Vec<CoverageGap>,
    },
}

fn referenced_suffix(referenced: &[ToolKey]) -> String {
    if referenced.is_empty() {
        return String::new();
    }
    let keys: Vec<&str> = referenced.iter().map(ToolKey::as_str).collect();
    format!(" (referenced tools: {})", keys.join(", "))
}

fn render_gaps(gaps: &[CoverageGap]) -> String {
    gaps.iter()
        .map(|g| format!("  {g}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl SecurityCoverageError {
    /// Tool keys that cannot be verified.
    pub fn missing_tools(&self) -> Vec<&ToolKey> {
        match self {
            Self::RegistryMissing { referenced, .. } => referenced.iter().collect(),
            Self::Incomplete { gaps } => gaps.iter().map(|g| &g.tool).collect(),
        }
    }
}

/// The emitter refused to produce a script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    /// A value destined for an expandable shell position contains command
    /// substitution syntax.
    #[error("refusing to emit {value:?}: command substitution is not allowed here")]
    CommandSubstitution {
        /// The offending value.
        value: String,
    },

    /// A verified installer's tool key is absent from the covered registry.
    #[error("tool '{tool}' is not covered by the checksum registry")]
    UncoveredTool {
        /// The key.
        tool: ToolKey,
    },

    /// Two artifacts would be written to the same file.
    #[error("two artifacts would both be written to {file_name}")]
    DuplicateArtifact {
        /// The contested file name.
        file_name: String,
    },

    /// An error raised while emitting one module.
    #[error("module {module}: {source}")]
    InModule {
        /// Module being emitted.
        module: ModuleId,
        /// Underlying refusal.
        #[source]
        source: Box<EmitError>,
    },
}

impl EmitError {
    /// Attach the module being emitted.
    pub fn in_module(self, module: &ModuleId) -> Self {
        match self {
            Self::InModule { .. } => self,
            other => Self::InModule {
                module: module.clone(),
                source: Box::new(other),
            },
        }
    }
}
