//! Filesystem-backed key-value store.
//!
//! Each key is stored as its own file, addressed by the SHA-256 hash of the
//! key so arbitrary key strings map to safe file names.

use crate::KeyValueStore;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tollgate_error::{StorageError, StorageErrorKind, TollgateResult};

/// Filesystem store.
///
/// Values live at `{base_path}/{hash[0:2]}/{hash[2:4]}/{hash}` where `hash`
/// is the hex SHA-256 of the key.
///
/// # Example Structure
///
/// ```text
/// ~/.local/share/tollgate/
/// ├── 3f/
/// │   └── a2/
/// │       └── 3fa2...  (quota/primary/requests)
/// └── 9c/
///     └── 01/
///         └── 9c01...  (cache/<fingerprint>)
/// ```
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so a reader never observes a partially written value.
#[derive(Debug)]
pub struct FileSystemStore {
    base_path: PathBuf,
    write_seq: AtomicU64,
}

impl FileSystemStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> TollgateResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Opened filesystem store");
        Ok(Self {
            base_path,
            write_seq: AtomicU64::new(0),
        })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn hash_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Path where the value for `key` is stored.
    fn value_path(&self, key: &str) -> PathBuf {
        let hash = Self::hash_key(key);
        self.base_path
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(&hash)
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("tmp.{}.{}", std::process::id(), seq))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileSystemStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> TollgateResult<Option<Vec<u8>>> {
        let path = self.value_path(key);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::trace!(bytes = bytes.len(), "Read value");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::new(StorageErrorKind::Read(format!(
                "{} ({}): {}",
                key,
                path.display(),
                e
            )))
            .into()),
        }
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &[u8]) -> TollgateResult<()> {
        let path = self.value_path(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = self.temp_path(&path);
        tokio::fs::write(&temp_path, value).await.map_err(|e| {
            StorageError::new(StorageErrorKind::Write(format!(
                "{} ({}): {}",
                key,
                temp_path.display(),
                e
            )))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::new(StorageErrorKind::Write(format!(
                "{} ({}): {}",
                key,
                path.display(),
                e
            )))
            .into());
        }

        tracing::debug!("Stored value");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> TollgateResult<()> {
        let path = self.value_path(key);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted value");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::new(StorageErrorKind::Delete(format!(
                "{} ({}): {}",
                key,
                path.display(),
                e
            )))
            .into()),
        }
    }
}
