//! # Output Directory
//!
//! Writing is two-phase. Every artifact is first staged into a temporary
//! file inside the output directory with its final mode; only once all of
//! them are staged are they renamed into place. A failure while staging
//! leaves the directory untouched, since dropped temp files delete
//! themselves.
//!
//! After the rename, `install_*.sh` files that carry the generated banner but
//! no longer correspond to a category are pruned. Files without the banner
//! are never touched.

use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};

use acfs_codegen::{ArtifactSet, GeneratedArtifact, GENERATED_BANNER};
use tempfile::NamedTempFile;
use thiserror::Error;

/// How much of a candidate script is searched for the generated banner.
const BANNER_SCAN_BYTES: u64 = 4096;

/// Filesystem failure while emitting or comparing artifacts.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The output directory could not be created or listed.
    #[error("failed to prepare output directory {path}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An artifact could not be staged.
    #[error("failed to stage {path}")]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A staged artifact could not be moved into place.
    #[error("failed to write {path}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stale generated script could not be removed.
    #[error("failed to remove stale {path}")]
    Prune {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An existing file could not be read for comparison.
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a write did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files written, in artifact order.
    pub written: Vec<String>,
    /// Stale generated scripts removed, sorted.
    pub pruned: Vec<String>,
}

/// How an on-disk file differs from freshly generated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    /// Contents differ.
    Changed,
    /// Contents match but the executable bit does not.
    ModeChanged,
    /// The file does not exist.
    Missing,
    /// A generated category script with no counterpart any more.
    Stale,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::ModeChanged => "mode changed",
            Self::Missing => "missing",
            Self::Stale => "stale",
        }
    }
}

/// One differing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub file_name: String,
    pub status: DiffStatus,
}

/// Write every artifact into `dir`, then prune stale generated scripts.
pub fn write_artifacts(dir: &Path, set: &ArtifactSet) -> Result<WriteReport, WriteError> {
    std::fs::create_dir_all(dir).map_err(|source| WriteError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut staged = Vec::with_capacity(set.len());
    for artifact in set {
        let target = dir.join(&artifact.file_name);
        let file = stage(dir, artifact).map_err(|source| WriteError::Stage {
            path: target.clone(),
            source,
        })?;
        staged.push((file, target));
    }
    tracing::debug!(staged = staged.len(), dir = %dir.display(), "staged artifacts");

    let mut report = WriteReport::default();
    for (file, target) in staged {
        file.persist(&target).map_err(|e| WriteError::Persist {
            path: target.clone(),
            source: e.error,
        })?;
        report.written.push(file_name_of(&target));
    }

    for name in stale_scripts(dir, set)? {
        let path = dir.join(&name);
        std::fs::remove_file(&path).map_err(|source| WriteError::Prune { path, source })?;
        tracing::info!(file = %name, "pruned stale generated script");
        report.pruned.push(name);
    }
    Ok(report)
}

/// Compare `set` against the files in `dir`. Empty means up to date.
pub fn diff_artifacts(dir: &Path, set: &ArtifactSet) -> Result<Vec<DiffEntry>, WriteError> {
    let mut entries = Vec::new();
    for artifact in set {
        let path = dir.join(&artifact.file_name);
        let existing = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                entries.push(DiffEntry {
                    file_name: artifact.file_name.clone(),
                    status: DiffStatus::Missing,
                });
                continue;
            }
            Err(source) => return Err(WriteError::Read { path, source }),
        };
        let status = if existing != artifact.contents.as_bytes() {
            Some(DiffStatus::Changed)
        } else if !mode_matches(&path, artifact) {
            Some(DiffStatus::ModeChanged)
        } else {
            None
        };
        if let Some(status) = status {
            entries.push(DiffEntry {
                file_name: artifact.file_name.clone(),
                status,
            });
        }
    }
    if dir.is_dir() {
        for name in stale_scripts(dir, set)? {
            entries.push(DiffEntry {
                file_name: name,
                status: DiffStatus::Stale,
            });
        }
    }
    Ok(entries)
}

fn stage(dir: &Path, artifact: &GeneratedArtifact) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(artifact.contents.as_bytes())?;
    file.as_file().sync_all()?;
    set_mode(file.as_file(), artifact.mode)?;
    Ok(file)
}

/// Generated `install_*.sh` files in `dir` that `set` does not contain.
fn stale_scripts(dir: &Path, set: &ArtifactSet) -> Result<Vec<String>, WriteError> {
    let listing = std::fs::read_dir(dir).map_err(|source| WriteError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut stale = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|source| WriteError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("install_") || !name.ends_with(".sh") || set.get(&name).is_some() {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if has_banner(&path).map_err(|source| WriteError::Read { path, source })? {
            stale.push(name);
        }
    }
    stale.sort();
    Ok(stale)
}

/// True if the head of the file contains the generated banner. Contents are
/// compared as bytes, so hand-written files need not be UTF-8.
fn has_banner(path: &Path) -> std::io::Result<bool> {
    let mut head = Vec::new();
    std::fs::File::open(path)?
        .take(BANNER_SCAN_BYTES)
        .read_to_end(&mut head)?;
    let banner = GENERATED_BANNER.as_bytes();
    Ok(head.windows(banner.len()).any(|w| w == banner))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn mode_matches(path: &Path, artifact: &GeneratedArtifact) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777 == artifact.mode)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn mode_matches(_path: &Path, _artifact: &GeneratedArtifact) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ArtifactSet {
        let loaded = acfs_manifest::load_str(
            "version: 1\nname: T\nid: acfs\ndefaults:\n  user: ubuntu\n  workspace_root: /data\n  mode: vibe\nmodules:\n  \
             - {id: base.system, description: b, install: [\"true\"], verify: [\"true\"]}\n  \
             - {id: shell.zsh, description: z, phase: 2, install: [\"true\"], verify: [\"true\"]}\n",
        )
        .unwrap();
        let graph = acfs_graph::validate(&loaded.manifest).unwrap();
        let seq = acfs_graph::sequence(&graph);
        let covered = acfs_codegen::check_coverage(
            &loaded.manifest,
            &acfs_manifest::ChecksumRegistry::default(),
        )
        .unwrap();
        acfs_codegen::emit(&acfs_codegen::EmitInput {
            manifest: &loaded.manifest,
            source_digest: &loaded.source_digest,
            sequence: &seq,
            registry: &covered,
        })
        .unwrap()
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn write_creates_directory_and_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("scripts").join("generated");
        let set = sample_set();
        let report = write_artifacts(&out, &set).unwrap();

        assert_eq!(report.written, set.file_names());
        assert!(report.pruned.is_empty());
        assert_eq!(
            listing(&out),
            vec![
                "doctor_checks.sh",
                "install_all.sh",
                "install_base.sh",
                "install_shell.sh",
                "manifest_index.sh",
            ]
        );
        let base = std::fs::read_to_string(out.join("install_base.sh")).unwrap();
        assert_eq!(base, set.get("install_base.sh").unwrap().contents);
    }

    #[cfg(unix)]
    #[test]
    fn modes_follow_artifact_kind() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), &sample_set()).unwrap();
        let mode = |name: &str| {
            std::fs::metadata(dir.path().join(name))
                .unwrap()
                .permissions()
                .mode()
                & 0o777
        };
        assert_eq!(mode("install_all.sh"), 0o755);
        assert_eq!(mode("doctor_checks.sh"), 0o755);
        assert_eq!(mode("manifest_index.sh"), 0o644);
    }

    #[test]
    fn stale_generated_scripts_are_pruned_but_hand_written_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("install_gone.sh"),
            format!("#!/usr/bin/env bash\n# {GENERATED_BANNER}\n"),
        )
        .unwrap();
        std::fs::write(dir.path().join("install_custom.sh"), "#!/bin/bash\necho mine\n").unwrap();

        let report = write_artifacts(dir.path(), &sample_set()).unwrap();
        assert_eq!(report.pruned, vec!["install_gone.sh"]);
        assert!(!dir.path().join("install_gone.sh").exists());
        assert!(dir.path().join("install_custom.sh").exists());
    }

    #[test]
    fn non_utf8_hand_written_script_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("install_custom.sh");
        std::fs::write(&custom, b"#!/bin/sh\n\xff\xfe echo mine\n").unwrap();
        let set = sample_set();

        let report = write_artifacts(dir.path(), &set).unwrap();
        assert!(report.pruned.is_empty());
        assert_eq!(std::fs::read(&custom).unwrap(), b"#!/bin/sh\n\xff\xfe echo mine\n");
        assert!(diff_artifacts(dir.path(), &set).unwrap().is_empty());
    }

    #[test]
    fn error_messages_do_not_repeat_the_cause() {
        let err = WriteError::Read {
            path: PathBuf::from("/x/install_custom.sh"),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "bad bytes"),
        };
        assert_eq!(err.to_string(), "failed to read /x/install_custom.sh");
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("bad bytes".to_string())
        );
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let set = sample_set();
        write_artifacts(dir.path(), &set).unwrap();
        assert_eq!(listing(dir.path()).len(), set.len());
    }

    #[test]
    fn diff_reports_missing_changed_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        let set = sample_set();
        assert_eq!(diff_artifacts(dir.path(), &set).unwrap().len(), set.len());

        write_artifacts(dir.path(), &set).unwrap();
        assert!(diff_artifacts(dir.path(), &set).unwrap().is_empty());

        std::fs::write(dir.path().join("install_base.sh"), "edited\n").unwrap();
        std::fs::remove_file(dir.path().join("doctor_checks.sh")).unwrap();
        std::fs::write(
            dir.path().join("install_old.sh"),
            format!("# {GENERATED_BANNER}\n"),
        )
        .unwrap();

        let diff = diff_artifacts(dir.path(), &set).unwrap();
        assert_eq!(
            diff,
            vec![
                DiffEntry {
                    file_name: "install_base.sh".into(),
                    status: DiffStatus::Changed
                },
                DiffEntry {
                    file_name: "doctor_checks.sh".into(),
                    status: DiffStatus::Missing
                },
                DiffEntry {
                    file_name: "install_old.sh".into(),
                    status: DiffStatus::Stale
                },
            ]
        );
    }

    #[test]
    fn diff_of_absent_directory_is_all_missing() {
        let dir = tempfile::tempdir().unwrap();
        let set = sample_set();
        let diff = diff_artifacts(&dir.path().join("nope"), &set).unwrap();
        assert_eq!(diff.len(), set.len());
        assert!(diff.iter().all(|e| e.status == DiffStatus::Missing));
    }
}
