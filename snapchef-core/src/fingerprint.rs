//! Content-addressed image fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Length of a hex-encoded SHA-256 digest.
const HEX_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid image hash: expected 64 hex characters, got {0:?}")]
pub struct InvalidFingerprint(pub String);

/// SHA-256 digest of raw image bytes, hex encoded.
///
/// Same bytes always give the same fingerprint, regardless of file name or the
/// format the upload claimed to be. This is the only key used by the caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", schema(value_type = String))]
pub struct ImageFingerprint(String);

impl ImageFingerprint {
    /// Fingerprint the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    /// Parse an externally supplied hash, e.g. from a URL path.
    pub fn parse(s: &str) -> Result<Self, InvalidFingerprint> {
        let trimmed = s.trim();
        if trimmed.len() != HEX_LEN || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidFingerprint(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Convenience wrapper around [`ImageFingerprint::of`].
pub fn fingerprint(bytes: &[u8]) -> ImageFingerprint {
    ImageFingerprint::of(bytes)
}
