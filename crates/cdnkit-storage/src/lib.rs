//! cdnkit Storage Library
//!
//! This crate provides the storage driver contract and its backends. A driver is
//! composed of a [`BlobClient`] (the only backend-specific part: local filesystem,
//! S3, or Google Cloud Storage) plus the shared naming, URL and caching logic, so
//! every backend stores objects under identical keys.
//!
//! # Object layout
//!
//! Creating `Pic.PNG` in bucket `avatars` writes two artifacts:
//!
//! - `avatars/pic.png` with the caller's content type, for inline delivery
//! - `avatars/pic-download.png`, a byte-identical copy served as an attachment
//!
//! Buckets are recorded by an empty `avatars/.bucket` marker object.

pub mod cache;
#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
pub mod cloud;
pub mod driver;
pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use cache::LocalCache;
#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
pub use cloud::ObjectStoreClient;
pub use driver::BackendDriver;
pub use factory::create_driver;
#[cfg(feature = "storage-local")]
pub use local::LocalClient;
pub use cdnkit_core::StorageBackend;
pub use traits::{
    BlobClient, NewObject, ObjectMetadata, StorageDriver, StorageError, StorageResult,
};
