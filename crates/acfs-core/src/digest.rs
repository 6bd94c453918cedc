//! # Content Digests
//!
//! `ContentDigest` identifies manifest content for drift detection and
//! derives deterministic heredoc delimiters. `Sha256Hex` is the validated
//! form of an expected installer hash read from the checksum registry.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// A SHA-256 digest of some byte content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    bytes: [u8; 32],
}

impl ContentDigest {
    /// Hash raw bytes.
    pub fn sha256(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self { bytes }
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First `n` hex characters (at most 64).
    pub fn short_hex(&self, n: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(n.min(64));
        hex
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Exactly 64 lowercase hex characters.
pub fn is_valid_sha256(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// A validated hex-encoded SHA-256 digest string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hex(String);

impl Sha256Hex {
    /// Validate and wrap a hex digest.
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if !is_valid_sha256(&value) {
            return Err(CoreError::InvalidDigest { value });
        }
        Ok(Self(value))
    }

    /// Return the digest as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ContentDigest> for Sha256Hex {
    fn from(digest: ContentDigest) -> Self {
        Self(digest.to_hex())
    }
}

impl TryFrom<String> for Sha256Hex {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Sha256Hex> for String {
    fn from(hex: Sha256Hex) -> Self {
        hex.0
    }
}

impl fmt::Display for Sha256Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_vector() {
        // sha256("{}")
        assert_eq!(
            ContentDigest::sha256(b"{}").to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn empty_input_vector() {
        assert_eq!(
            ContentDigest::sha256(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn display_is_prefixed() {
        let s = ContentDigest::sha256(b"abc").to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn short_hex_truncates() {
        let d = ContentDigest::sha256(b"lang.bun");
        assert_eq!(d.short_hex(8).len(), 8);
        assert!(d.to_hex().starts_with(&d.short_hex(8)));
        assert_eq!(d.short_hex(100).len(), 64);
    }

    #[test]
    fn sha256_hex_validation() {
        assert!(Sha256Hex::parse("a".repeat(64)).is_ok());
        assert!(Sha256Hex::parse("A".repeat(64)).is_err());
        assert!(Sha256Hex::parse("a".repeat(63)).is_err());
        assert!(Sha256Hex::parse("g".repeat(64)).is_err());
    }

    #[test]
    fn sha256_hex_from_digest_is_valid() {
        let hex: Sha256Hex = ContentDigest::sha256(b"x").into();
        assert!(is_valid_sha256(hex.as_str()));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Hex rendering of any digest passes registry validation.
        #[test]
        fn digest_hex_always_valid(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let digest = ContentDigest::sha256(&data);
            prop_assert!(is_valid_sha256(&digest.to_hex()));
        }

        /// Hashing is deterministic.
        #[test]
        fn digest_deterministic(data in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(ContentDigest::sha256(&data), ContentDigest::sha256(&data));
        }
    }
}
