//! BlobStore trait and the in-memory backend.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::warn;

use crate::error::{Result, StoreError};

/// Key-addressed storage for text blobs.
///
/// Keys are opaque strings; a backend may reject keys it cannot represent
/// with [`StoreError::InvalidKey`]. All writes are upserts and the store is
/// assumed to be strongly consistent.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the content stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `content` under `key`, replacing any previous value.
    async fn put(&self, key: &str, content: &str) -> Result<()>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List every key, optionally restricted to those starting with `prefix`.
    ///
    /// Keys are returned in sorted order.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>>;

    /// Move the content of `from` to `to`, overwriting `to` if it exists.
    ///
    /// The default is a two-phase copy-then-delete with no compensation: if
    /// the delete fails after the copy succeeded, both keys hold the content
    /// and the error is returned. Backends with a native move override this.
    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let content = self
            .get(from)
            .await?
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;

        if from == to {
            return Ok(());
        }

        self.put(to, &content).await?;

        if let Err(e) = self.delete(from).await {
            warn!(
                "Rename left a duplicate: '{}' was copied to '{}' but could not be deleted: {}",
                from, to, e
            );
            return Err(e);
        }

        Ok(())
    }
}

/// In-memory blob store.
///
/// Useful for tests and for running the service without persistence.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.read().unwrap();
        Ok(blobs.get(key).cloned())
    }

    async fn put(&self, key: &str, content: &str) -> Result<()> {
        let mut blobs = self.blobs.write().unwrap();
        blobs.insert(key.to_string(), content.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut blobs = self.blobs.write().unwrap();
        blobs.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let blobs = self.blobs.read().unwrap();
        let keys = match prefix {
            Some(prefix) => blobs
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            None => blobs.keys().cloned().collect(),
        };
        Ok(keys)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        // Single lock scope, so the move is atomic for this backend
        let mut blobs = self.blobs.write().unwrap();
        let content = blobs
            .get(from)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        if from != to {
            blobs.insert(to.to_string(), content);
            blobs.remove(from);
        }
        Ok(())
    }
}
