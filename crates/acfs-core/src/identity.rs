//! # Identifier Newtypes
//!
//! Newtype wrappers for the identifier namespaces of the manifest. You cannot
//! pass a `ToolKey` where a `ModuleId` is expected.
//!
//! ## Security Invariant
//!
//! A `ModuleId` or `Category` only ever contains `[a-z0-9_.]`, so its shell
//! identifier form (`acfs_install_<ident>`) and its heredoc delimiter form are
//! valid shell words without quoting. The emitter relies on this.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Upper bound on identifier length. Shell function names have no practical
/// limit, but anything this long is a manifest authoring mistake.
const MAX_IDENT_LEN: usize = 128;

fn is_segment(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_lowercase() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Unique identifier of a module: lowercase dotted segments, each starting
/// with a letter. Examples: `base.system`, `lang.bun`, `agents`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId(String);

impl ModuleId {
    /// Pattern description used in error messages.
    pub const PATTERN: &'static str = "^[a-z][a-z0-9_]*(\\.[a-z][a-z0-9_]*)*$";

    /// Validate and wrap a module id.
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_IDENT_LEN || !value.split('.').all(is_segment) {
            return Err(CoreError::InvalidIdentifier {
                kind: "module id",
                value,
                reason: "expected lowercase dotted segments, each starting with a letter",
            });
        }
        Ok(Self(value))
    }

    /// Access the id as written in the manifest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shell identifier form: dots become underscores (`lang.bun` → `lang_bun`).
    ///
    /// Distinct ids can collide here (`a.b_c` and `a_b.c`); the graph
    /// validator reports such collisions as duplicates.
    pub fn shell_ident(&self) -> String {
        self.0.replace('.', "_")
    }

    /// Name of the generated install function for this module.
    ///
    /// Category aggregates are `install_<category>`; the `acfs_` prefix keeps
    /// a single-segment id such as `base` from shadowing the `base`
    /// aggregate.
    pub fn install_function(&self) -> String {
        format!("acfs_install_{}", self.shell_ident())
    }

    /// Category implied by the id: its first dotted segment.
    pub fn implied_category(&self) -> Category {
        let head = self.0.split('.').next().unwrap_or(&self.0);
        Category(head.to_string())
    }
}

impl TryFrom<String> for ModuleId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ModuleId> for String {
    fn from(id: ModuleId) -> Self {
        id.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category grouping of modules; one generated script per category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Pattern description used in error messages.
    pub const PATTERN: &'static str = "^[a-z][a-z0-9_]*$";

    /// Names no module may use as its category. `install_all.sh` is the
    /// master installer.
    pub const RESERVED: &'static [&'static str] = &["all"];

    /// Validate and wrap a category name.
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.len() > MAX_IDENT_LEN || !is_segment(&value) {
            return Err(CoreError::InvalidIdentifier {
                kind: "category",
                value,
                reason: "expected a lowercase word starting with a letter",
            });
        }
        Ok(Self(value))
    }

    /// Access the category name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the name collides with a fixed artifact.
    pub fn is_reserved_name(name: &str) -> bool {
        Self::RESERVED.iter().any(|reserved| *reserved == name)
    }

    /// Name of the aggregate function installing the whole category.
    pub fn install_function(&self) -> String {
        format!("install_{}", self.0)
    }

    /// File name of the generated category script.
    pub fn script_name(&self) -> String {
        format!("install_{}.sh", self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a verified installer in the checksum registry (`bun`, `uv`, `rust`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolKey(String);

impl ToolKey {
    /// Pattern description used in error messages.
    pub const PATTERN: &'static str = "^[a-z0-9][a-z0-9._-]*$";

    /// Validate and wrap a tool key.
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let valid = value.len() <= MAX_IDENT_LEN
            && value
                .bytes()
                .next()
                .is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            && value.bytes().all(|b| {
                b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-')
            });
        if !valid {
            return Err(CoreError::InvalidIdentifier {
                kind: "tool key",
                value,
                reason: "expected lowercase alphanumerics, '.', '_' or '-'",
            });
        }
        Ok(Self(value))
    }

    /// Access the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ToolKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ToolKey> for String {
    fn from(key: ToolKey) -> Self {
        key.0
    }
}

impl fmt::Display for ToolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
