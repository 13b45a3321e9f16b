//! Directory-backed entry store.
//!
//! Each entry lives in `<dir>/<hex hash>.entry`. Writes go to a temp file in
//! the same directory which is then persisted without clobbering, so a
//! reader never sees a partial entry and racing writers of the same content
//! settle on a single file.

use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::EntryStore;
use crate::error::StoreError;
use crate::hash::EntryHash;

const ENTRY_EXTENSION: &str = "entry";

pub struct FileEntryStore {
    dir: PathBuf,
}

impl FileEntryStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StoreError::Io(format!(
                "Failed to create entry directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        tracing::debug!("Opened file entry store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, hash: &EntryHash) -> PathBuf {
        self.dir.join(format!("{}.{}", hash.to_hex(), ENTRY_EXTENSION))
    }
}

#[async_trait]
impl EntryStore for FileEntryStore {
    async fn write_bytes(&self, hash: EntryHash, bytes: Vec<u8>) -> Result<bool, StoreError> {
        let dir = self.dir.clone();
        let path = self.entry_path(&hash);

        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            if path.exists() {
                return Ok(false);
            }
            persist_new(&dir, &path, &bytes)
        })
        .await
        .map_err(|e| StoreError::Io(format!("Blocking write task failed: {}", e)))?
    }

    async fn read_bytes(&self, hash: &EntryHash) -> Result<Option<Arc<[u8]>>, StoreError> {
        match tokio::fs::read(self.entry_path(hash)).await {
            Ok(bytes) => Ok(Some(Arc::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn hashes(&self) -> Result<Vec<EntryHash>, StoreError> {
        let mut hashes = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match stem.parse::<EntryHash>() {
                Ok(hash) => hashes.push(hash),
                Err(e) => tracing::warn!("Skipping unexpected file {}: {}", path.display(), e),
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}

/// Write `bytes` to `path` through a temp file in `dir`. Returns `false`
/// when another writer created `path` first.
fn persist_new(dir: &Path, path: &Path, bytes: &[u8]) -> Result<bool, StoreError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StoreError::Io(format!(
            "Failed to persist entry {}: {}",
            path.display(),
            e.error
        ))),
    }
}
