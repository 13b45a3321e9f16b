//! Eventual visibility over another store.
//!
//! A replicated store accepts a write before every reader can see it. This
//! wrapper reproduces that locally: each new write stays hidden until its
//! settle delay has elapsed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::EntryStore;
use crate::error::StoreError;
use crate::hash::EntryHash;

pub struct SettlingEntryStore<S> {
    inner: S,
    settle: Duration,
    visible_at: RwLock<HashMap<EntryHash, Instant>>,
}

impl<S: EntryStore> SettlingEntryStore<S> {
    pub fn new(inner: S, settle: Duration) -> Self {
        Self {
            inner,
            settle,
            visible_at: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn is_settled(&self, hash: &EntryHash) -> bool {
        let mut visible_at = self.visible_at.write().await;
        match visible_at.get(hash) {
            Some(at) if Instant::now() < *at => false,
            Some(_) => {
                visible_at.remove(hash);
                true
            }
            None => true,
        }
    }
}

#[async_trait]
impl<S: EntryStore> EntryStore for SettlingEntryStore<S> {
    async fn write_bytes(&self, hash: EntryHash, bytes: Vec<u8>) -> Result<bool, StoreError> {
        // Readers wait on this lock, so the deadline exists before they can look.
        let mut visible_at = self.visible_at.write().await;
        let written = self.inner.write_bytes(hash, bytes).await?;
        if written {
            visible_at.insert(hash, Instant::now() + self.settle);
        }
        Ok(written)
    }

    async fn read_bytes(&self, hash: &EntryHash) -> Result<Option<Arc<[u8]>>, StoreError> {
        if !self.is_settled(hash).await {
            return Ok(None);
        }
        self.inner.read_bytes(hash).await
    }

    async fn hashes(&self) -> Result<Vec<EntryHash>, StoreError> {
        let mut visible = Vec::new();
        for hash in self.inner.hashes().await? {
            if self.is_settled(&hash).await {
                visible.push(hash);
            }
        }
        Ok(visible)
    }
}
