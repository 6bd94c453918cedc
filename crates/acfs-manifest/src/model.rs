//! # Manifest Data Model
//!
//! Typed representation of `acfs.manifest.yaml`. Instances are only produced
//! by [`crate::schema::ManifestValidator`], after the raw value passed every
//! shape and refinement check; the serde derives mirror the embedded schema
//! so deserialization of a validated value cannot fail in practice.

use serde::{Deserialize, Serialize};

use acfs_core::{Category, ModuleId, ToolKey};

/// Lowest permitted phase.
pub const MIN_PHASE: u8 = 1;
/// Highest permitted phase.
pub const MAX_PHASE: u8 = 10;
/// Phase of a module that does not declare one.
pub const DEFAULT_PHASE: u8 = 1;

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

/// The whole manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Manifest format version.
    pub version: u32,
    /// Human-readable project name.
    pub name: String,
    /// Short project id.
    pub id: String,
    /// Project-wide defaults.
    pub defaults: Defaults,
    /// Modules in manifest order. Never empty.
    pub modules: Vec<Module>,
}

impl Manifest {
    /// Look up a module by id.
    pub fn module(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| &m.id == id)
    }
}

/// Execution mode of the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Passwordless sudo, permissive agent settings.
    Vibe,
    /// Conservative defaults.
    Safe,
}

impl Mode {
    /// Manifest spelling of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vibe => "vibe",
            Self::Safe => "safe",
        }
    }
}

/// Project-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Account the `target_user` context runs as.
    pub user: String,
    /// Absolute path of the workspace root.
    pub workspace_root: String,
    /// Installer mode.
    pub mode: Mode,
}

/// Identity a module's commands execute under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunAs {
    /// The configured target user (default).
    #[default]
    TargetUser,
    /// root.
    Root,
    /// Whoever runs the installer.
    Current,
}

impl RunAs {
    /// Manifest spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetUser => "target_user",
            Self::Root => "root",
            Self::Current => "current",
        }
    }

    /// Runtime helper that executes a heredoc or argv under this identity.
    pub fn shell_helper(&self) -> &'static str {
        match self {
            Self::TargetUser => "run_as_target_shell",
            Self::Root => "run_as_root_shell",
            Self::Current => "run_as_current_shell",
        }
    }

    /// Runtime helper that executes an interpreter argv under this identity.
    pub fn runner_helper(&self) -> &'static str {
        match self {
            Self::TargetUser => "run_as_target_runner",
            Self::Root => "run_as_root_shell",
            Self::Current => "run_as_current_shell",
        }
    }
}

/// Interpreter allowlist for verified installers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Runner {
    /// `bash`
    Bash,
    /// `sh`
    Sh,
}

impl Runner {
    /// Interpreter binary name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Sh => "sh",
        }
    }
}

/// Reference to an upstream install script verified against the checksum
/// registry before execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifiedInstaller {
    /// Registry key.
    pub tool: ToolKey,
    /// Interpreter the script is fed to.
    pub runner: Runner,
    /// Arguments passed after `-s --`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Unverified source used only when verification cannot be established.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

/// Command that reports whether a module is already installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstalledCheck {
    /// Identity the check runs as; defaults to the module's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as: Option<RunAs>,
    /// Shell command; exit 0 means installed.
    pub command: String,
}

/// One installable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Module {
    /// Unique dotted id.
    pub id: ModuleId,
    /// One-line description, logged at install time.
    pub description: String,
    /// Explicit category; defaults to the id's first segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Execution identity.
    #[serde(default)]
    pub run_as: RunAs,
    /// Checksum-gated upstream installer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_installer: Option<VerifiedInstaller>,
    /// Failure of an optional module does not abort the run.
    #[serde(default)]
    pub optional: bool,
    /// Installed unless explicitly deselected.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled_by_default: bool,
    /// False for hand-maintained modules that get no install function.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub generated: bool,
    /// Skip installation when this succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_check: Option<InstalledCheck>,
    /// Install batch, 1..=10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<u8>,
    /// Ordered install steps.
    #[serde(default)]
    pub install: Vec<String>,
    /// Ordered verify steps; never empty.
    pub verify: Vec<String>,
    /// Modules that must be installed first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ModuleId>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free-form notes for humans.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Alternative names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Upstream documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
}

impl Module {
    /// Declared phase, or [`DEFAULT_PHASE`].
    pub fn effective_phase(&self) -> u8 {
        self.phase.unwrap_or(DEFAULT_PHASE)
    }

    /// Declared category, or the id's first segment.
    pub fn effective_category(&self) -> Category {
        self.category
            .clone()
            .unwrap_or_else(|| self.id.implied_category())
    }

    /// Identity the installed-check runs as.
    pub fn installed_check_run_as(&self) -> Option<RunAs> {
        self.installed_check
            .as_ref()
            .map(|c| c.run_as.unwrap_or(self.run_as))
    }
}
