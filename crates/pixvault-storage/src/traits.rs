//! Blob store abstraction trait.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use pixvault_core::AppError;
use std::pin::Pin;
use thiserror::Error;

/// Blob store operation errors.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Put failed: {0}")]
    PutFailed(String),

    #[error("Get failed: {0}")]
    GetFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BlobResult<T> = Result<T, BlobStoreError>;

/// Streamed blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = BlobResult<Bytes>> + Send>>;

impl From<BlobStoreError> for AppError {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::NotFound(key) => AppError::NotFound(format!("blob {}", key)),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Key-addressed binary storage.
///
/// Backends provide no atomicity across keys; each operation stands alone.
/// Writes are idempotent replacements, so re-running a processing job that
/// targets the same keys is safe.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing blob.
    async fn put(&self, key: &str, data: Vec<u8>) -> BlobResult<()>;

    /// Fetch the full contents of a blob.
    async fn get(&self, key: &str) -> BlobResult<Vec<u8>>;

    /// Fetch a blob as a stream of chunks (for serving large originals).
    async fn get_stream(&self, key: &str) -> BlobResult<ByteStream>;

    /// Delete a blob. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> BlobResult<()>;

    async fn exists(&self, key: &str) -> BlobResult<bool>;

    /// Prepare a key prefix (a directory on filesystem backends). Used when a
    /// library or folder is created, before its metadata row exists.
    async fn create_prefix(&self, prefix: &str) -> BlobResult<()>;

    /// Remove a prefix and everything under it. Removing a missing prefix
    /// succeeds.
    async fn delete_prefix(&self, prefix: &str) -> BlobResult<()>;
}
