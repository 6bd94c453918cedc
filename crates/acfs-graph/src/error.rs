//! Graph validation errors and advisories.
//!
//! Every fatal finding is a [`GraphError`] addressed by the same dotted
//! field-path convention the schema layer uses. Collected into
//! [`GraphErrors`] so a manifest author sees all of them at once.

use std::fmt;

use acfs_core::ModuleId;
use thiserror::Error;

/// What kind of graph violation was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphErrorKind {
    /// Two modules share an id, or two distinct ids map to the same shell
    /// identifier. `first` is the module seen first.
    DuplicateId {
        /// The earlier module.
        first: ModuleId,
    },
    /// A dependency names no module.
    UnknownDependency,
    /// The dependency edge closes a cycle through `members`.
    Cycle {
        /// Cycle members in traversal order, starting at the edge target.
        members: Vec<ModuleId>,
    },
    /// A module depends on a module in a later phase.
    PhaseViolation {
        /// Phase of the dependent module.
        phase: u8,
        /// Phase of its dependency.
        dependency_phase: u8,
    },
}

impl GraphErrorKind {
    /// Short stable name for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate-id",
            Self::UnknownDependency => "unknown-dependency",
            Self::Cycle { .. } => "cycle",
            Self::PhaseViolation { .. } => "phase-violation",
        }
    }
}

/// One graph violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphError {
    /// Violation kind and its details.
    pub kind: GraphErrorKind,
    /// Module the violation is attributed to.
    pub module: ModuleId,
    /// Dotted field path, e.g. `modules.lang.bun.dependencies`.
    pub path: String,
    /// Offending value (the dependency id, or the duplicate id).
    pub value: String,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] ", self.path, self.kind.as_str())?;
        match &self.kind {
            GraphErrorKind::DuplicateId { first } if first.as_str() == self.value => {
                write!(f, "module id '{}' is declared more than once", self.value)
            }
            GraphErrorKind::DuplicateId { first } => write!(
                f,
                "module id '{}' collides with '{}' (both generate {})",
                self.value,
                first,
                self.module.install_function()
            ),
            GraphErrorKind::UnknownDependency => {
                write!(f, "'{}' depends on unknown module '{}'", self.module, self.value)
            }
            GraphErrorKind::Cycle { members } => {
                let chain: Vec<&str> = members.iter().map(ModuleId::as_str).collect();
                write!(
                    f,
                    "dependency cycle: {} -> {}",
                    chain.join(" -> "),
                    chain.first().copied().unwrap_or_default()
                )
            }
            GraphErrorKind::PhaseViolation {
                phase,
                dependency_phase,
            } => write!(
                f,
                "'{}' (phase {phase}) depends on '{}' (phase {dependency_phase}); \
                 a dependency cannot run in a later phase",
                self.module, self.value
            ),
        }
    }
}

/// Every fatal graph violation found in one pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} dependency graph violation(s):\n{}", .errors.len(), render_lines(.errors))]
pub struct GraphErrors {
    errors: Vec<GraphError>,
}

fn render_lines(items: &[GraphError]) -> String {
    items
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl GraphErrors {
    /// Wrap a set of violations.
    pub fn new(errors: Vec<GraphError>) -> Self {
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
    pub fn errors(&self) -> &[GraphError] {
        &self.errors
    }
}

/// Non-fatal finding about a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    /// Module concerned.
    pub module: ModuleId,
    /// Dotted field path.
    pub path: String,
    /// What looks wrong.
    pub message: String,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
