//! Content digests used as entry identities.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of an [`EntryHash`] in bytes.
pub const HASH_LEN: usize = 32;

/// SHA-256 digest of an entry's canonical encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryHash([u8; HASH_LEN]);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashParseError {
    #[error("Invalid hex in entry hash: {0}")]
    InvalidHex(String),
    #[error("Entry hash must be {expected} bytes, got {found}")]
    InvalidLength { expected: usize, found: usize },
}

impl EntryHash {
    /// Digest the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let mut digest = [0u8; HASH_LEN];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }

    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryHash({})", self.to_hex())
    }
}

impl FromStr for EntryHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
        let array: [u8; HASH_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| HashParseError::InvalidLength {
                    expected: HASH_LEN,
                    found: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl Serialize for EntryHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EntryHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
