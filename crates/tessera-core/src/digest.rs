//! # Request Fingerprints
//!
//! A [`Fingerprint`] is the SHA-256 digest of a proof request's
//! [`CanonicalBytes`]. It is the dedup key of the job registry and the handle
//! clients use to poll a job across retries and daemon restarts.
//!
//! ## Security Invariant
//!
//! [`Fingerprint::of`] accepts only [`CanonicalBytes`], so every fingerprint
//! in the system was produced from canonically serialized data.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// Stable 32-byte digest of a canonicalized request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(#[serde(with = "hex::serde")] [u8; 32]);

impl Fingerprint {
    /// Fingerprint canonical bytes.
    pub fn of(data: &CanonicalBytes) -> Self {
        Self(sha256_raw(data.as_bytes()))
    }

    /// Wrap raw digest bytes (e.g. parsed from a URL path).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex fingerprint.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the fingerprint as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// SHA-256 over raw bytes.
///
/// Used for binary artifacts (ceremony files, validator leaves) that have
/// their own canonical encoding and do not go through JSON.
pub fn sha256_raw(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}
