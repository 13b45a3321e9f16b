//! In-memory entry store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::EntryStore;
use crate::error::StoreError;
use crate::hash::EntryHash;

/// Entry store backed by a hash map. First write for a key wins.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: RwLock<HashMap<EntryHash, Arc<[u8]>>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn write_bytes(&self, hash: EntryHash, bytes: Vec<u8>) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&hash) {
            return Ok(false);
        }
        entries.insert(hash, Arc::from(bytes));
        Ok(true)
    }

    async fn read_bytes(&self, hash: &EntryHash) -> Result<Option<Arc<[u8]>>, StoreError> {
        Ok(self.entries.read().await.get(hash).cloned())
    }

    async fn hashes(&self) -> Result<Vec<EntryHash>, StoreError> {
        let mut hashes: Vec<EntryHash> = self.entries.read().await.keys().copied().collect();
        hashes.sort();
        Ok(hashes)
    }
}
