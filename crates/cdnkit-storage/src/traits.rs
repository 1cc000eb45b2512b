//! Storage abstraction traits
//!
//! [`BlobClient`] is the per-backend capability surface: raw key-level operations
//! against one physical bucket. [`StorageDriver`] is the object/bucket contract the
//! rest of an application uses; it is implemented once, over any `BlobClient`.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use cdnkit_core::{AppError, UrlSchemes};
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The primary artifact was written but its download copy was not. The primary
    /// is left in place.
    #[error("Partial create of {key}: {reason}")]
    PartialCreate { key: String, reason: String },

    #[error("Bucket not empty: {0}")]
    BucketNotEmpty(String),

    #[error(transparent)]
    Core(#[from] AppError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata applied to an artifact when it is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

impl ObjectMetadata {
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            content_disposition: None,
        }
    }
}

/// Key-level operations against one physical backend.
///
/// Keys are `/`-separated and relative to the backend's root (bucket or directory).
#[async_trait]
pub trait BlobClient: Send + Sync {
    /// Write `data` under `key`, replacing anything already there.
    async fn upload(&self, key: &str, data: Bytes, metadata: &ObjectMetadata) -> StorageResult<()>;

    /// Copy `from_key` to `to_key`, applying `metadata` to the copy.
    async fn copy(&self, from_key: &str, to_key: &str, metadata: &ObjectMetadata)
        -> StorageResult<()>;

    /// Delete `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Read the whole object. A missing key is [`StorageError::NotFound`].
    async fn download(&self, key: &str) -> StorageResult<Bytes>;

    /// Every key starting with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    fn backend_type(&self) -> StorageBackend;
}

/// Input for [`StorageDriver::object_create`].
#[derive(Debug, Clone)]
pub struct NewObject {
    /// Logical bucket slug.
    pub bucket: String,
    /// Local file holding the bytes to store.
    pub source: PathBuf,
    /// Original filename; determines the keys.
    pub filename: String,
    /// MIME type of the primary artifact.
    pub mime: String,
    /// Name offered by the browser's "Save As"; defaults to `file{ext}`.
    pub display_name: Option<String>,
}

/// The storage driver contract.
///
/// Every failure is returned as an explicit error value and also recorded as the
/// driver's last error.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Store an object as its primary and download artifacts.
    async fn object_create(&self, object: &NewObject) -> StorageResult<()>;

    /// Whether the primary artifact exists. Backend failures read as `false` and are
    /// recorded as the last error.
    async fn object_exists(&self, filename: &str, bucket: &str) -> bool;

    /// Delete both artifacts of an object. Missing artifacts are not an error.
    async fn object_destroy(&self, filename: &str, bucket: &str) -> StorageResult<()>;

    /// A local filesystem path holding the object's bytes, fetched on first use.
    async fn object_local_path(&self, bucket: &str, filename: &str) -> StorageResult<PathBuf>;

    /// Create a bucket. Creating an existing bucket succeeds without touching the backend.
    async fn bucket_create(&self, bucket: &str) -> StorageResult<()>;

    /// Destroy a bucket according to the configured destroy policy.
    async fn bucket_destroy(&self, bucket: &str) -> StorageResult<()>;

    /// URL generators for objects stored by this driver.
    fn urls(&self) -> &UrlSchemes;

    fn backend_type(&self) -> StorageBackend;

    /// Message of the most recent failed operation, if any.
    fn last_error(&self) -> Option<String>;
}
