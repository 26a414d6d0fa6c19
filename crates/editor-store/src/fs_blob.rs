//! Filesystem blob store.

use async_trait::async_trait;
use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::blob::BlobStore;
use crate::error::{Result, StoreError};
use crate::key::validate_key;

/// Directory under the root used for staged writes. Never listed.
const STAGING_DIR: &str = ".staging";

/// Blob store backed by a single flat directory.
///
/// Each key is one file directly under `root`, named by the percent-encoded
/// key, so `a` and `a/b` can live side by side the way they do in an object
/// bucket. Writes land in a staging file first and are moved into place with
/// an atomic rename, so a reader never observes a partially written blob.
pub struct FsBlobStore {
    root: PathBuf,
}

fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

impl FsBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(STAGING_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk file name for `key`.
    pub fn file_name(key: &str) -> String {
        urlencoding::encode(key).into_owned()
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;

        if key == STAGING_DIR {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: format!("'{}' is reserved", STAGING_DIR),
            });
        }

        Ok(self.root.join(Self::file_name(key)))
    }

    /// Key for a file name in the root, if it is one this store wrote.
    fn name_to_key(name: &str) -> Option<String> {
        let key = urlencoding::decode(name).ok()?;
        (Self::file_name(&key) == name).then(|| key.into_owned())
    }

    /// Generate a random hex string for staging file names.
    fn random_hex() -> String {
        let bytes: [u8; 16] = rand::rng().random();
        hex::encode(bytes)
    }

    async fn atomic_write(&self, path: &Path, content: &str) -> io::Result<()> {
        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;
        let temp_path = staging.join(format!("{}.tmp", Self::random_hex()));

        if let Err(e) = fs::write(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }

    async fn is_file(path: &Path) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if is_absent(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_to_path(key)?;

        if !Self::is_file(&path).await? {
            return Ok(None);
        }

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, content: &str) -> Result<()> {
        let path = self.key_to_path(key)?;
        self.atomic_write(&path, content).await?;
        debug!("Stored {} bytes at {:?}", content.len(), path);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if is_absent(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if is_absent(&e) => return Ok(keys),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(Self::name_to_key) {
                Some(key) => keys.push(key),
                None => debug!("Skipping foreign file {:?}", name),
            }
        }

        if let Some(prefix) = prefix {
            keys.retain(|k| k.starts_with(prefix));
        }
        keys.sort();
        Ok(keys)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.key_to_path(from)?;
        let to_path = self.key_to_path(to)?;

        if !Self::is_file(&from_path).await? {
            return Err(StoreError::NotFound(from.to_string()));
        }

        if from_path == to_path {
            return Ok(());
        }

        // rename(2) replaces an existing target file atomically
        fs::rename(&from_path, &to_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (TempDir, FsBlobStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path().join("bucket")).await.unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_temp, store) = create_test_store().await;

        store.put("settings.yaml", "a: 1\n").await.unwrap();

        assert_eq!(
            store.get("settings.yaml").await.unwrap().as_deref(),
            Some("a: 1\n")
        );
        assert!(store.root().join("settings.yaml").exists());
    }

    #[tokio::test]
    async fn test_nested_keys_are_flat_files() {
        let (_temp, store) = create_test_store().await;

        store.put("conf/prod/app.toml", "x = 1").await.unwrap();

        assert!(store.root().join("conf%2Fprod%2Fapp.toml").is_file());
        assert!(!store.root().join("conf").exists());
        assert_eq!(store.list(None).await.unwrap(), vec!["conf/prod/app.toml"]);
    }

    #[tokio::test]
    async fn test_key_beside_its_own_prefix() {
        let (_temp, store) = create_test_store().await;
        store.put("a", "x").await.unwrap();

        // Absent keys under an existing key behave like any absent key
        assert!(store.get("a/b").await.unwrap().is_none());
        store.delete("a/b").await.unwrap();
        assert!(matches!(
            store.rename("a/b", "c").await,
            Err(StoreError::NotFound(_))
        ));

        store.put("a/b", "y").await.unwrap();
        store.put("d/e", "z").await.unwrap();
        store.put("d", "w").await.unwrap();

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("x"));
        assert_eq!(store.get("a/b").await.unwrap().as_deref(), Some("y"));
        assert_eq!(store.get("d").await.unwrap().as_deref(), Some("w"));
        assert_eq!(
            store.list(None).await.unwrap(),
            vec!["a", "a/b", "d", "d/e"]
        );

        store.rename("a/b", "d").await.unwrap();
        assert_eq!(store.get("d").await.unwrap().as_deref(), Some("y"));
        assert_eq!(store.list(None).await.unwrap(), vec!["a", "d", "d/e"]);
    }

    #[tokio::test]
    async fn test_encoded_names_do_not_collide() {
        let (_temp, store) = create_test_store().await;
        store.put("a/b", "slash").await.unwrap();
        store.put("a%2Fb", "literal").await.unwrap();

        assert_eq!(store.get("a/b").await.unwrap().as_deref(), Some("slash"));
        assert_eq!(store.get("a%2Fb").await.unwrap().as_deref(), Some("literal"));
        assert_eq!(store.list(None).await.unwrap(), vec!["a%2Fb", "a/b"]);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_temp, store) = create_test_store().await;
        store.put("conf/app.toml", "").await.unwrap();

        assert!(store.get("missing").await.unwrap().is_none());
        assert!(store.get("conf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_foreign_entries() {
        let (_temp, store) = create_test_store().await;
        store.put("kept", "").await.unwrap();
        fs::create_dir(store.root().join("subdir")).await.unwrap();
        // Not a name this store would write for any key
        fs::write(store.root().join("has space"), "x").await.unwrap();

        assert_eq!(store.list(None).await.unwrap(), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_list_skips_staging_and_sorts() {
        let (_temp, store) = create_test_store().await;
        store.put("b", "").await.unwrap();
        store.put("a", "").await.unwrap();
        store.put(".env", "").await.unwrap();
        fs::write(store.root().join(STAGING_DIR).join("junk.tmp"), "x")
            .await
            .unwrap();

        assert_eq!(store.list(None).await.unwrap(), vec![".env", "a", "b"]);
        assert_eq!(store.list(Some("a")).await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_staged_writes_leave_no_temp_files() {
        let (_temp, store) = create_test_store().await;
        store.put("a", "1").await.unwrap();
        store.put("a", "2").await.unwrap();

        let mut staging = fs::read_dir(store.root().join(STAGING_DIR)).await.unwrap();
        assert!(staging.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (_temp, store) = create_test_store().await;
        store.delete("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_overwrites_and_moves() {
        let (_temp, store) = create_test_store().await;
        store.put("a.txt", "from a").await.unwrap();
        store.put("b.txt", "from b").await.unwrap();

        store.rename("a.txt", "b.txt").await.unwrap();

        assert!(store.get("a.txt").await.unwrap().is_none());
        assert_eq!(store.get("b.txt").await.unwrap().as_deref(), Some("from a"));
    }

    #[tokio::test]
    async fn test_rename_across_prefixes() {
        let (_temp, store) = create_test_store().await;
        store.put("old/a.txt", "x").await.unwrap();

        store.rename("old/a.txt", "new/dir/a.txt").await.unwrap();

        assert_eq!(store.list(None).await.unwrap(), vec!["new/dir/a.txt"]);
        assert_eq!(store.get("new/dir/a.txt").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let (_temp, store) = create_test_store().await;
        let err = store.rename("missing", "b").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_invalid_and_reserved_keys() {
        let (_temp, store) = create_test_store().await;

        assert!(matches!(
            store.put("../escape", "x").await,
            Err(StoreError::InvalidKey { .. })
        ));
        assert!(matches!(
            store.put(".staging", "x").await,
            Err(StoreError::InvalidKey { .. })
        ));
        // Only the staging name itself is reserved
        store.put(".staging/x", "x").await.unwrap();
        assert!(matches!(
            store.get("").await,
            Err(StoreError::InvalidKey { .. })
        ));
    }
}
