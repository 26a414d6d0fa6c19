//! File API: list, read, write, delete and rename over the blob store.
//!
//! Every operation takes an [`Access`], so it can only run after the auth
//! gate has passed and no store I/O happens for a rejected request.

use std::sync::Arc;

use editor_store::BlobStore;
use tracing::info;

use crate::auth::Access;
use crate::error::ApiError;

pub struct FileApi {
    blobs: Arc<dyn BlobStore>,
}

fn require_key(key: &str) -> Result<(), ApiError> {
    if key.is_empty() {
        return Err(ApiError::BadInput("File name must not be empty".to_string()));
    }
    Ok(())
}

impl FileApi {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Every key in the store, sorted.
    pub async fn list(&self, _access: &Access) -> Result<Vec<String>, ApiError> {
        Ok(self.blobs.list(None).await?)
    }

    pub async fn read(&self, _access: &Access, key: &str) -> Result<String, ApiError> {
        require_key(key)?;
        self.blobs.get(key).await?.ok_or(ApiError::NotFound)
    }

    /// Upsert `content` under `key`.
    pub async fn write(&self, _access: &Access, key: &str, content: &str) -> Result<(), ApiError> {
        require_key(key)?;
        self.blobs.put(key, content).await?;
        info!("Wrote {} ({} bytes)", key, content.len());
        Ok(())
    }

    /// Delete `key`. An absent key is not an error.
    pub async fn delete(&self, _access: &Access, key: &str) -> Result<(), ApiError> {
        require_key(key)?;
        self.blobs.delete(key).await?;
        info!("Deleted {}", key);
        Ok(())
    }

    /// Move `old_key` to `new_key`, overwriting `new_key` if present.
    ///
    /// Fails with NotFound if `old_key` is absent. Whether the move is atomic
    /// depends on the backend; see [`BlobStore::rename`].
    pub async fn rename(
        &self,
        _access: &Access,
        old_key: &str,
        new_key: &str,
    ) -> Result<(), ApiError> {
        require_key(old_key)?;
        require_key(new_key)?;
        self.blobs.rename(old_key, new_key).await?;
        info!("Renamed {} -> {}", old_key, new_key);
        Ok(())
    }
}
