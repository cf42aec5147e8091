use crate::traits::{BlobResult, BlobStore, BlobStoreError, ByteStream};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem blob store.
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `base_path` (e.g. `/var/lib/pixvault/blobs`),
    /// creating the directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> BlobResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            BlobStoreError::Backend(format!(
                "Failed to create blob directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore { base_path })
    }

    /// Convert a blob key to a filesystem path, rejecting traversal sequences
    /// that could escape the base directory.
    fn key_to_path(&self, key: &str) -> BlobResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> BlobResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> BlobResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            BlobStoreError::PutFailed(format!("Failed to create {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            BlobStoreError::PutFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            BlobStoreError::PutFailed(format!("Failed to sync {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob stored"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BlobStoreError::NotFound(key.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            BlobStoreError::GetFailed(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    async fn get_stream(&self, key: &str) -> BlobResult<ByteStream> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BlobStoreError::NotFound(key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            BlobStoreError::GetFailed(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let stream = tokio_util::io::ReaderStream::new(file)
            .map(|chunk| chunk.map_err(|e| BlobStoreError::GetFailed(e.to_string())));

        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            BlobStoreError::DeleteFailed(format!("Failed to delete {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %key, "Blob deleted");
        Ok(())
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn create_prefix(&self, prefix: &str) -> BlobResult<()> {
        let path = self.key_to_path(prefix)?;
        fs::create_dir_all(&path).await.map_err(|e| {
            BlobStoreError::Backend(format!(
                "Failed to create prefix {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn delete_prefix(&self, prefix: &str) -> BlobResult<()> {
        let path = self.key_to_path(prefix)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_dir_all(&path).await.map_err(|e| {
            BlobStoreError::DeleteFailed(format!(
                "Failed to delete prefix {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(prefix = %prefix, "Blob prefix deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        store.put("lib/a/file", b"bytes".to_vec()).await.unwrap();
        assert!(store.exists("lib/a/file").await.unwrap());
        assert_eq!(store.get("lib/a/file").await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        for key in ["../../etc/passwd", "/etc/passwd", "a/../b", ""] {
            let result = store.get(key).await;
            assert!(
                matches!(result, Err(BlobStoreError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[tokio::test]
    async fn delete_missing_key_succeeds() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();
        assert!(store.delete("nope/missing").await.is_ok());
        assert!(store.delete_prefix("nope").await.is_ok());
    }

    #[tokio::test]
    async fn delete_prefix_removes_everything_under_it() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        store.create_prefix("lib").await.unwrap();
        store.put("lib/one", vec![1]).await.unwrap();
        store.put("lib/tn_sm/one", vec![2]).await.unwrap();

        store.delete_prefix("lib").await.unwrap();
        assert!(!store.exists("lib/one").await.unwrap());
        assert!(!store.exists("lib/tn_sm/one").await.unwrap());
    }

    #[tokio::test]
    async fn get_stream_yields_the_full_blob() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        let data = vec![7u8; 8192];
        store.put("lib/big", data.clone()).await.unwrap();

        let mut stream = store.get_stream("lib/big").await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, data);
    }
}
