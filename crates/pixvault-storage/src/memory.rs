//! In-memory blob store, used by tests and small deployments.

use crate::traits::{BlobResult, BlobStore, BlobStoreError, ByteStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Blob store backed by a `HashMap`. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    prefixes: Arc<Mutex<HashSet<String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored (prefixes excluded).
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().unwrap().is_empty()
    }

    /// Snapshot of all stored keys, for test assertions.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// True when the prefix was created with `create_prefix` and not removed.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefixes.lock().unwrap().contains(prefix)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> BlobResult<()> {
        self.blobs.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))
    }

    async fn get_stream(&self, key: &str) -> BlobResult<ByteStream> {
        let data = self.get(key).await?;
        Ok(Box::pin(stream::once(async move {
            Ok(Bytes::from(data))
        })))
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        Ok(self.blobs.lock().unwrap().contains_key(key))
    }

    async fn create_prefix(&self, prefix: &str) -> BlobResult<()> {
        self.prefixes.lock().unwrap().insert(prefix.to_string());
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> BlobResult<()> {
        let exact = prefix.to_string();
        let nested = format!("{}/", prefix);
        self.blobs
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(&nested) && *key != exact);
        self.prefixes
            .lock()
            .unwrap()
            .retain(|p| !p.starts_with(&nested) && *p != exact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_and_overwrite() {
        let store = MemoryBlobStore::new();
        store.put("k", vec![1, 2]).await.unwrap();
        store.put("k", vec![3]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), vec![3]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.get("missing").await,
            Err(BlobStoreError::NotFound(_))
        ));
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn delete_prefix_is_scoped() {
        let store = MemoryBlobStore::new();
        store.put("lib1/a", vec![1]).await.unwrap();
        store.put("lib1/tn_sm/a", vec![2]).await.unwrap();
        store.put("lib10/b", vec![3]).await.unwrap();

        store.delete_prefix("lib1").await.unwrap();

        assert_eq!(store.keys(), vec!["lib10/b".to_string()]);
    }
}
