//! Content-addressed entry storage
//!
//! Backends implement three byte-level primitives; hashing, encoding and
//! integrity checks live in the provided methods so every backend behaves
//! the same at the entry level.

pub mod file;
pub mod memory;
pub mod settling;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::codec;
use crate::entry::InterchangeEntry;
use crate::error::StoreError;
use crate::hash::EntryHash;

pub use file::FileEntryStore;
pub use memory::MemoryEntryStore;
pub use settling::SettlingEntryStore;

/// How long to wait, and how often to look, for a write to become readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            timeout: Duration::from_secs(5),
        }
    }
}

impl VisibilityPolicy {
    /// Look exactly once.
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            timeout: Duration::ZERO,
        }
    }
}

/// Storage capability for interchange entries.
///
/// Writes are idempotent: identical content always maps to the same key and
/// the same bytes, so a repeated or concurrent `put` of an entry is harmless.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Store bytes under `hash`. Returns `false` if the key was already present.
    async fn write_bytes(&self, hash: EntryHash, bytes: Vec<u8>) -> Result<bool, StoreError>;

    /// Fetch the bytes stored under `hash`, if currently visible.
    async fn read_bytes(&self, hash: &EntryHash) -> Result<Option<Arc<[u8]>>, StoreError>;

    /// All currently visible keys, sorted.
    async fn hashes(&self) -> Result<Vec<EntryHash>, StoreError>;

    /// Encode and store an entry, returning its hash.
    async fn put(&self, entry: &InterchangeEntry) -> Result<EntryHash, StoreError> {
        let (hash, bytes) = codec::encode_with_hash(entry)?;
        if self.write_bytes(hash, bytes).await? {
            tracing::info!(%hash, "Stored new interchange entry");
        } else {
            tracing::debug!(%hash, "Entry already stored");
        }
        Ok(hash)
    }

    /// Fetch and decode an entry, checking the bytes against the key.
    async fn get(&self, hash: &EntryHash) -> Result<InterchangeEntry, StoreError> {
        let bytes = self
            .read_bytes(hash)
            .await?
            .ok_or(StoreError::NotFound(*hash))?;

        let actual = EntryHash::of(&bytes);
        if actual != *hash {
            tracing::warn!(%hash, %actual, "Stored bytes do not match their key");
            return Err(StoreError::Integrity {
                hash: *hash,
                reason: format!("stored bytes hash to {}", actual),
            });
        }

        Ok(codec::decode(&bytes)?)
    }

    async fn contains(&self, hash: &EntryHash) -> Result<bool, StoreError> {
        Ok(self.read_bytes(hash).await?.is_some())
    }

    /// Poll `get` until the entry is visible or the policy's timeout elapses.
    async fn await_visible(
        &self,
        hash: &EntryHash,
        policy: &VisibilityPolicy,
    ) -> Result<InterchangeEntry, StoreError> {
        let deadline = Instant::now() + policy.timeout;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.get(hash).await {
                Err(StoreError::NotFound(_)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::debug!(%hash, attempts, "Entry did not become visible");
                        return Err(StoreError::NotFound(*hash));
                    }
                    tokio::time::sleep(policy.poll_interval.min(deadline - now)).await;
                }
                other => return other,
            }
        }
    }
}
