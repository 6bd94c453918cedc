//! # Heredoc Embedding
//!
//! Command bodies are never quoted into a script line. They are embedded
//! verbatim as the body of a heredoc with a single-quoted delimiter, which
//! disables every expansion in the outer script, and piped to an
//! identity-switching helper.
//!
//! Delimiters are derived from the module id, so regenerating an unchanged
//! manifest yields identical scripts:
//!
//! ```text
//! ACFS_<KIND>_<IDENT>_<first 8 hex of sha256(id)>_<index>
//! ```
//!
//! If a body contains a line equal to the delimiter, `_<n>` is appended
//! until it does not.

use acfs_core::{ContentDigest, ModuleId};

/// Which block a heredoc belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeredocKind {
    /// Installed-check command.
    Check,
    /// Install step.
    Install,
    /// Verify step.
    Verify,
}

impl HeredocKind {
    fn tag(&self) -> &'static str {
        match self {
            Self::Check => "CHECK",
            Self::Install => "INSTALL",
            Self::Verify => "VERIFY",
        }
    }
}

/// Collision-free delimiter for `body`.
pub fn delimiter(kind: HeredocKind, id: &ModuleId, index: usize, body: &str) -> String {
    let hash = ContentDigest::sha256(id.as_str().as_bytes()).short_hex(8);
    let base = format!(
        "ACFS_{}_{}_{}_{}",
        kind.tag(),
        id.shell_ident().to_ascii_uppercase(),
        hash,
        index
    );
    let collides = |candidate: &str| body.lines().any(|line| line == candidate);
    if !collides(&base) {
        return base;
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}_{n}");
        if !collides(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Body text terminated by exactly one newline.
pub fn normalized_body(body: &str) -> String {
    let mut out = body.trim_end_matches(['\n', '\r']).to_string();
    out.push('\n');
    out
}
