//! # acfs-codegen: Security Gate & Shell Emitter
//!
//! Turns a sequenced manifest into the generated bash installer tree:
//!
//! | Artifact | Contents |
//! |----------|----------|
//! | `install_<category>.sh` | per-module install functions + `install_<category> [phase]` |
//! | `doctor_checks.sh` | tab-delimited check table + runner |
//! | `install_all.sh` | sources every category script, runs phases in order |
//! | `manifest_index.sh` | data-only module metadata + manifest sha256 |
//!
//! ## Security Model
//!
//! - [`gate::check_coverage`] must pass before anything is emitted. Its
//!   [`CoveredRegistry`] is the only registry [`emit`] accepts.
//! - Free text only reaches a script through [`quote`]: escaped inside
//!   double quotes, or single-quoted. Command bodies are heredoc bodies
//!   under single-quoted delimiters ([`heredoc`]).
//! - Installer arguments may use `$TARGET_USER`/`$TARGET_HOME`; anything
//!   containing command substitution is an [`EmitError`].
//!
//! ## Crate Policy
//!
//! - Pure: artifacts are rendered in memory. Writing them is the driver's
//!   job, and only happens after every artifact rendered.
//! - Deterministic: no timestamps, no hash-map iteration order in output.

pub mod artifact;
mod category;
pub mod doctor;
pub mod error;
pub mod gate;
pub mod heredoc;
mod index;
mod master;
mod module;
pub mod quote;
mod script;

use acfs_core::ContentDigest;
use acfs_graph::Sequence;
use acfs_manifest::{Manifest, Module};

pub use artifact::{
    ArtifactKind, ArtifactSet, GeneratedArtifact, DOCTOR_SCRIPT, GENERATED_BANNER, INDEX_SCRIPT,
    MASTER_SCRIPT,
};
pub use error::{CoverageGap, EmitError, GapReason, SecurityCoverageError};
pub use gate::{check_coverage, missing_registry, CoveredRegistry, VerifiedSource};
pub use script::RUNTIME_LIBRARIES;

/// Everything the emitter needs.
#[derive(Debug, Clone, Copy)]
pub struct EmitInput<'a, 'm> {
    /// The validated manifest.
    pub manifest: &'m Manifest,
    /// SHA-256 of the manifest source text.
    pub source_digest: &'a ContentDigest,
    /// Install order.
    pub sequence: &'a Sequence<'m>,
    /// Registry that passed the security gate.
    pub registry: &'a CoveredRegistry,
}

/// Render every artifact.
///
/// # Errors
///
/// Returns an [`EmitError`] if any module cannot be emitted safely, or if two
/// artifacts share a file name. Nothing is returned partially.
pub fn emit(input: &EmitInput<'_, '_>) -> Result<ArtifactSet, EmitError> {
    let categories = input.sequence.categories();
    let mut set = ArtifactSet::default();

    for category in &categories {
        let members: Vec<&Module> = input
            .sequence
            .iter()
            .filter(|m| &m.effective_category() == category)
            .collect();
        let contents = category::render_category(category, &members, input.registry)?;
        set.push(GeneratedArtifact::new(
            ArtifactKind::Category(category.clone()),
            contents,
        ))?;
    }

    let checks = doctor::doctor_checks(input.sequence.iter());
    set.push(GeneratedArtifact::new(
        ArtifactKind::Doctor,
        doctor::render_doctor(&checks),
    ))?;

    let plan = master::phase_plan(input.sequence);
    set.push(GeneratedArtifact::new(
        ArtifactKind::Master,
        master::render_master(&categories, &plan),
    ))?;

    set.push(GeneratedArtifact::new(
        ArtifactKind::Index,
        index::render_index(input.manifest, input.source_digest, input.sequence, &categories),
    ))?;

    tracing::debug!(
        artifacts = set.len(),
        categories = categories.len(),
        checks = checks.len(),
        "rendered artifacts"
    );
    Ok(set)
}
