//! # Error Types
//!
//! Errors raised by the validated constructors in this crate. Higher layers
//! wrap these into their own collected error sets with a field path.

use thiserror::Error;

/// Error raised when a primitive value fails its validated constructor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier did not match its pattern.
    #[error("invalid {kind} {value:?}: {reason}")]
    InvalidIdentifier {
        /// Which identifier namespace was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// What the pattern requires.
        reason: &'static str,
    },

    /// A digest string was not 64 lowercase hex characters.
    #[error("invalid sha256 digest {value:?} (expected 64 lowercase hex chars)")]
    InvalidDigest {
        /// The rejected input.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_identifier_display() {
        let err = CoreError::InvalidIdentifier {
            kind: "module id",
            value: "Bad.Id".to_string(),
            reason: "lowercase dotted segments",
        };
        let msg = err.to_string();
        assert!(msg.contains("module id"));
        assert!(msg.contains("Bad.Id"));
    }

    #[test]
    fn invalid_digest_display() {
        let err = CoreError::InvalidDigest {
            value: "xyz".to_string(),
        };
        assert!(err.to_string().contains("64 lowercase hex"));
    }
}
