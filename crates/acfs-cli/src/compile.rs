//! # Compile
//!
//! The pipeline behind every mode: manifest → graph → sequence → security
//! gate → render. Nothing touches the output directory until every stage
//! has passed, so a rejected manifest leaves it exactly as it was.
//!
//! Graph validation and the security gate both run before either result is
//! inspected, so one run reports dependency violations and coverage gaps
//! together.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgGroup, Args};
use thiserror::Error;

use acfs_codegen::{
    check_coverage, emit, missing_registry, ArtifactSet, EmitError, EmitInput,
    SecurityCoverageError,
};
use acfs_graph::{Advisory, GraphErrors};
use acfs_manifest::{ChecksumRegistry, ManifestError, RegistryError};

use crate::config::{CompilePaths, PathOverrides};
use crate::output::{diff_artifacts, write_artifacts};

/// Lines of each artifact shown by `--dry-run -v`.
const PREVIEW_LINES: usize = 12;

/// Arguments selecting the mode and overriding input/output paths.
#[derive(Args, Debug, Default)]
#[command(group(
    ArgGroup::new("mode")
        .args(["dry_run", "validate", "diff"])
        .multiple(false)
))]
pub struct CompileArgs {
    /// List the files that would be generated without writing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Run every check and report pass/fail. Writes nothing.
    #[arg(long)]
    pub validate: bool,

    /// Compare fresh output with the output directory; exit 1 on any difference.
    #[arg(long)]
    pub diff: bool,

    /// Manifest path (default: acfs.manifest.yaml under the repository root).
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Checksum registry path (default: checksums.yaml under the repository root).
    #[arg(long, value_name = "PATH")]
    pub checksums: Option<PathBuf>,

    /// Output directory (default: scripts/generated under the repository root).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// What a run does with the rendered artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    DryRun,
    Validate,
    Diff,
}

impl CompileArgs {
    pub fn mode(&self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else if self.validate {
            Mode::Validate
        } else if self.diff {
            Mode::Diff
        } else {
            Mode::Write
        }
    }

    /// Path flags, anchored at `cwd` when relative.
    pub fn overrides(&self, cwd: &Path) -> PathOverrides {
        let anchor = |p: &Option<PathBuf>| p.as_ref().map(|p| crate::resolve_path(p, cwd));
        PathOverrides {
            manifest: anchor(&self.manifest),
            checksums: anchor(&self.checksums),
            output_dir: anchor(&self.output_dir),
        }
    }
}

/// The manifest, the registry or the generated output was rejected.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The manifest could not be read, parsed or schema-validated.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The checksum registry exists but could not be read or parsed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Dependency graph violations, coverage gaps, or both.
    #[error("{}", render_invalid(.graph, .coverage))]
    Invalid {
        graph: Option<GraphErrors>,
        coverage: Option<SecurityCoverageError>,
    },

    /// The emitter refused a module.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl CompileError {
    /// True for failures of the environment rather than of the inputs.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            Self::Manifest(ManifestError::Io { .. } | ManifestError::SchemaBuild(_))
                | Self::Registry(RegistryError::Io { .. })
        )
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        if self.is_operational() {
            2
        } else {
            1
        }
    }
}

fn render_invalid(graph: &Option<GraphErrors>, coverage: &Option<SecurityCoverageError>) -> String {
    let parts: Vec<String> = [
        graph.as_ref().map(ToString::to_string),
        coverage.as_ref().map(ToString::to_string),
    ]
    .into_iter()
    .flatten()
    .collect();
    parts.join("\n")
}

/// Counts reported after a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub modules: usize,
    pub categories: usize,
    pub phases: usize,
    pub manifest_sha256: String,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} module(s), {} categor{}, {} phase(s), manifest sha256 {}",
            self.modules,
            self.categories,
            if self.categories == 1 { "y" } else { "ies" },
            self.phases,
            self.manifest_sha256
        )
    }
}

/// A fully rendered, not yet written, compilation.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub artifacts: ArtifactSet,
    pub summary: Summary,
    pub advisories: Vec<Advisory>,
}

/// Run every check and render every artifact. Performs no writes.
pub fn compile(paths: &CompilePaths) -> Result<Compilation, CompileError> {
    let loaded = acfs_manifest::load(&paths.manifest)?;
    let manifest = &loaded.manifest;
    tracing::info!(
        path = %paths.manifest.display(),
        modules = manifest.modules.len(),
        "manifest passed schema validation"
    );

    let graph = acfs_graph::validate(manifest);

    let coverage = match ChecksumRegistry::load(&paths.checksums) {
        Ok(registry) => check_coverage(manifest, &registry),
        Err(RegistryError::Missing { path }) => Err(missing_registry(manifest, &path)),
        Err(e) => return Err(e.into()),
    };

    let (graph, covered) = match (graph, coverage) {
        (Ok(graph), Ok(covered)) => (graph, covered),
        (graph, coverage) => {
            return Err(CompileError::Invalid {
                graph: graph.err(),
                coverage: coverage.err(),
            })
        }
    };
    tracing::info!(
        edges = graph.edge_count(),
        verified = covered.len(),
        "graph and checksum coverage validated"
    );

    let sequence = acfs_graph::sequence(&graph);
    let artifacts = emit(&EmitInput {
        manifest,
        source_digest: &loaded.source_digest,
        sequence: &sequence,
        registry: &covered,
    })?;

    Ok(Compilation {
        summary: Summary {
            modules: sequence.len(),
            categories: sequence.categories().len(),
            phases: sequence.phases().len(),
            manifest_sha256: loaded.source_digest.to_hex(),
        },
        advisories: graph.advisories().to_vec(),
        artifacts,
    })
}

/// Execute one run in the selected mode.
///
/// Returns exit code: 0 on success, 1 on rejected input or a `--diff`
/// difference. Operational failures are returned as errors.
pub fn run_compile(args: &CompileArgs, paths: &CompilePaths, verbose: u8) -> Result<u8> {
    let mode = args.mode();
    tracing::debug!(
        ?mode,
        manifest = %paths.manifest.display(),
        output = %paths.output_dir.display(),
        "starting"
    );

    let compilation = match compile(paths) {
        Ok(compilation) => compilation,
        Err(e) if e.is_operational() => return Err(e.into()),
        Err(e) => {
            println!("FAIL: {e}");
            println!("No files were written.");
            return Ok(e.exit_code());
        }
    };

    match mode {
        Mode::Validate => {
            println!("PASS: {}", paths.manifest.display());
            print_summary(&compilation);
            Ok(0)
        }
        Mode::DryRun => {
            println!(
                "Would write {} file(s) to {}:",
                compilation.artifacts.len(),
                paths.output_dir.display()
            );
            for artifact in &compilation.artifacts {
                println!(
                    "  {:<24} {:o}  {:>7} bytes  sha256:{}",
                    artifact.file_name,
                    artifact.mode,
                    artifact.contents.len(),
                    artifact.digest().short_hex(12)
                );
                if verbose > 0 {
                    for line in artifact.contents.lines().take(PREVIEW_LINES) {
                        println!("      | {line}");
                    }
                    let total = artifact.contents.lines().count();
                    if total > PREVIEW_LINES {
                        println!("      | ... {} more line(s)", total - PREVIEW_LINES);
                    }
                }
            }
            print_summary(&compilation);
            Ok(0)
        }
        Mode::Diff => {
            let entries = diff_artifacts(&paths.output_dir, &compilation.artifacts)?;
            if entries.is_empty() {
                println!("Up to date: {}", paths.output_dir.display());
                return Ok(0);
            }
            for entry in &entries {
                println!("  {}: {}", entry.status.as_str(), entry.file_name);
            }
            println!(
                "{} file(s) in {} differ from the manifest; rerun acfs-manifest to regenerate.",
                entries.len(),
                paths.output_dir.display()
            );
            Ok(1)
        }
        Mode::Write => {
            let report = write_artifacts(&paths.output_dir, &compilation.artifacts)?;
            println!(
                "Wrote {} file(s) to {}",
                report.written.len(),
                paths.output_dir.display()
            );
            for name in &report.pruned {
                println!("  removed stale {name}");
            }
            print_summary(&compilation);
            Ok(0)
        }
    }
}

fn print_summary(compilation: &Compilation) {
    println!("{}", compilation.summary);
    if !compilation.advisories.is_empty() {
        println!("{} advisory warning(s):", compilation.advisories.len());
        for advisory in &compilation.advisories {
            println!("  WARN: {advisory}");
        }
    }
}
