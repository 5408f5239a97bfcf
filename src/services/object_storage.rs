//! The object store seam: where video binaries live.
//!
//! The ingestion and deletion workflows only see this trait, so the S3
//! backend, the local-disk backend and test fakes are interchangeable.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Connectivity or credential failure; the store could not be reached.
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    /// The store was reached but rejected the write.
    #[error("object store rejected write: {0}")]
    WriteFailed(String),
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `content` under `key` and return its public URL.
    ///
    /// On failure nothing is visible at `key`.
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> StorageResult<String>;

    /// Remove the object at `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Connectivity probe against the configured bucket.
    async fn head_bucket(&self) -> StorageResult<()>;

    /// Name of the bucket (or directory) objects are written to.
    fn bucket(&self) -> &str;
}
