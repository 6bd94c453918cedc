//! Generated artifacts and the set produced by one compilation.

use acfs_core::{Category, ContentDigest};

use crate::error::EmitError;

/// Banner carried by every generated file. The driver only prunes files
/// that contain it.
pub const GENERATED_BANNER: &str = "AUTO-GENERATED FROM acfs.manifest.yaml - DO NOT EDIT";

/// File name of the doctor checks script.
pub const DOCTOR_SCRIPT: &str = "doctor_checks.sh";
/// File name of the master installer.
pub const MASTER_SCRIPT: &str = "install_all.sh";
/// File name of the manifest index.
pub const INDEX_SCRIPT: &str = "manifest_index.sh";

const EXECUTABLE_MODE: u32 = 0o755;
const DATA_MODE: u32 = 0o644;

/// What an artifact is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `install_<category>.sh`.
    Category(Category),
    /// `doctor_checks.sh`.
    Doctor,
    /// `install_all.sh`.
    Master,
    /// `manifest_index.sh`.
    Index,
}

/// One generated file, fully rendered in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Kind of artifact.
    pub kind: ArtifactKind,
    /// File name inside the output directory.
    pub file_name: String,
    /// Complete file contents.
    pub contents: String,
    /// Unix permission bits.
    pub mode: u32,
}

impl GeneratedArtifact {
    pub(crate) fn new(kind: ArtifactKind, contents: String) -> Self {
        let (file_name, mode) = match &kind {
            ArtifactKind::Category(category) => (category.script_name(), EXECUTABLE_MODE),
            ArtifactKind::Doctor => (DOCTOR_SCRIPT.to_string(), EXECUTABLE_MODE),
            ArtifactKind::Master => (MASTER_SCRIPT.to_string(), EXECUTABLE_MODE),
            ArtifactKind::Index => (INDEX_SCRIPT.to_string(), DATA_MODE),
        };
        Self {
            kind,
            file_name,
            contents,
            mode,
        }
    }

    /// SHA-256 of the contents.
    pub fn digest(&self) -> ContentDigest {
        ContentDigest::sha256(self.contents.as_bytes())
    }

    /// True for scripts meant to be executed.
    pub fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }
}

/// Every artifact of one compilation, in write order: category scripts in
/// category order, then doctor, master and index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    artifacts: Vec<GeneratedArtifact>,
}

impl ArtifactSet {
    /// Append an artifact. File names are unique within a set.
    pub(crate) fn push(&mut self, artifact: GeneratedArtifact) -> Result<(), EmitError> {
        if self.get(&artifact.file_name).is_some() {
            return Err(EmitError::DuplicateArtifact {
                file_name: artifact.file_name,
            });
        }
        self.artifacts.push(artifact);
        Ok(())
    }

    /// Iterate artifacts in write order.
    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedArtifact> {
        self.artifacts.iter()
    }

    /// Number of artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Look up an artifact by file name.
    pub fn get(&self, file_name: &str) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|a| a.file_name == file_name)
    }

    /// File names in write order.
    pub fn file_names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.file_name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a GeneratedArtifact;
    type IntoIter = std::slice::Iter<'a, GeneratedArtifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_modes() {
        let cat = GeneratedArtifact::new(
            ArtifactKind::Category(Category::parse("lang").unwrap()),
            String::new(),
        );
        assert_eq!(cat.file_name, "install_lang.sh");
        assert!(cat.is_executable());
        let index = GeneratedArtifact::new(ArtifactKind::Index, String::new());
        assert_eq!(index.file_name, INDEX_SCRIPT);
        assert_eq!(index.mode, 0o644);
        assert!(!index.is_executable());
    }

    #[test]
    fn push_refuses_a_second_artifact_with_the_same_name() {
        let mut set = ArtifactSet::default();
        set.push(GeneratedArtifact::new(ArtifactKind::Master, "master".into()))
            .unwrap();
        let err = set
            .push(GeneratedArtifact::new(
                ArtifactKind::Category(Category::parse("all").unwrap()),
                "category".into(),
            ))
            .unwrap_err();
        assert_eq!(
            err,
            EmitError::DuplicateArtifact {
                file_name: MASTER_SCRIPT.to_string()
            }
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(MASTER_SCRIPT).unwrap().contents, "master");
    }
}
