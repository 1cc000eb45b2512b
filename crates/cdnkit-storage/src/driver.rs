//! The storage driver, implemented once over any [`BlobClient`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use cdnkit_core::naming::{
    bucket_marker_key, bucket_prefix, default_display_name, download_disposition,
    is_reserved_name, object_keys, DOWNLOAD_CONTENT_TYPE,
};
use cdnkit_core::{BucketDestroyPolicy, UrlSchemes};
use tokio::fs;

use crate::cache::LocalCache;
use crate::traits::{
    BlobClient, NewObject, ObjectMetadata, StorageDriver, StorageError, StorageResult,
};
use crate::StorageBackend;

/// Storage driver composed of a backend client, the local cache and URL generation.
pub struct BackendDriver {
    client: Arc<dyn BlobClient>,
    cache: LocalCache,
    urls: UrlSchemes,
    destroy_policy: BucketDestroyPolicy,
    last_error: Mutex<Option<String>>,
}

impl BackendDriver {
    pub fn new(
        client: Arc<dyn BlobClient>,
        cache: LocalCache,
        urls: UrlSchemes,
        destroy_policy: BucketDestroyPolicy,
    ) -> Self {
        Self {
            client,
            cache,
            urls,
            destroy_policy,
            last_error: Mutex::new(None),
        }
    }

    /// Record a failed operation and pass the error through.
    fn fail(&self, operation: &str, error: StorageError) -> StorageError {
        tracing::error!(
            backend = %self.client.backend_type(),
            operation = operation,
            error = %error,
            "Storage operation failed"
        );
        self.set_error(format!("{}: {}", operation, error));
        error
    }

    fn set_error(&self, message: String) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(message);
        }
    }

    async fn create_artifacts(&self, object: &NewObject) -> StorageResult<()> {
        if is_reserved_name(&object.bucket, &object.filename) {
            return Err(StorageError::InvalidKey(format!(
                "{} is reserved for the bucket marker",
                object.filename
            )));
        }

        let start = std::time::Instant::now();
        let keys = object_keys(&object.bucket, &object.filename);
        let data = Bytes::from(fs::read(&object.source).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to read source {}: {}",
                object.source.display(),
                e
            ))
        })?);
        let size = data.len();

        self.client
            .upload(
                &keys.primary,
                data,
                &ObjectMetadata::with_content_type(object.mime.clone()),
            )
            .await?;

        let display_name = object
            .display_name
            .clone()
            .unwrap_or_else(|| default_display_name(&object.filename));
        let download_metadata = ObjectMetadata {
            content_type: Some(DOWNLOAD_CONTENT_TYPE.to_string()),
            content_disposition: Some(download_disposition(&display_name)),
        };

        self.client
            .copy(&keys.primary, &keys.download, &download_metadata)
            .await
            .map_err(|e| StorageError::PartialCreate {
                key: keys.primary.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            bucket = %object.bucket,
            key = %keys.primary,
            download_key = %keys.download,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object created"
        );

        Ok(())
    }

    async fn destroy_artifacts(&self, filename: &str, bucket: &str) -> StorageResult<()> {
        let keys = object_keys(bucket, filename);

        // Download copy first so a failed second delete leaves a servable object.
        self.client.delete(&keys.download).await?;
        self.client.delete(&keys.primary).await?;

        tracing::info!(bucket = %bucket, key = %keys.primary, "Object destroyed");
        Ok(())
    }

    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        let marker = bucket_marker_key(bucket);
        if self.client.exists(&marker).await? {
            return Ok(());
        }

        self.client
            .upload(&marker, Bytes::new(), &ObjectMetadata::default())
            .await?;

        tracing::info!(bucket = %bucket, "Bucket created");
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> StorageResult<()> {
        let marker = bucket_marker_key(bucket);
        let keys: Vec<String> = self
            .client
            .list(&bucket_prefix(bucket))
            .await?
            .into_iter()
            .filter(|key| *key != marker)
            .collect();

        if !keys.is_empty() && self.destroy_policy == BucketDestroyPolicy::RefuseNonEmpty {
            return Err(StorageError::BucketNotEmpty(format!(
                "{} holds {} object(s)",
                bucket,
                keys.len()
            )));
        }

        for key in &keys {
            self.client.delete(key).await?;
        }
        self.client.delete(&marker).await?;

        tracing::info!(bucket = %bucket, objects_deleted = keys.len(), "Bucket destroyed");
        Ok(())
    }
}

#[async_trait]
impl StorageDriver for BackendDriver {
    async fn object_create(&self, object: &NewObject) -> StorageResult<()> {
        self.create_artifacts(object)
            .await
            .map_err(|e| self.fail("object_create", e))
    }

    async fn object_exists(&self, filename: &str, bucket: &str) -> bool {
        let key = object_keys(bucket, filename).primary;
        match self.client.exists(&key).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Existence check failed; reporting absent");
                self.set_error(format!("object_exists: {}", e));
                false
            }
        }
    }

    async fn object_destroy(&self, filename: &str, bucket: &str) -> StorageResult<()> {
        self.destroy_artifacts(filename, bucket)
            .await
            .map_err(|e| self.fail("object_destroy", e))
    }

    async fn object_local_path(&self, bucket: &str, filename: &str) -> StorageResult<PathBuf> {
        self.cache
            .resolve(self.client.as_ref(), bucket, filename)
            .await
            .map_err(|e| self.fail("object_local_path", e))
    }

    async fn bucket_create(&self, bucket: &str) -> StorageResult<()> {
        self.ensure_bucket(bucket)
            .await
            .map_err(|e| self.fail("bucket_create", e))
    }

    async fn bucket_destroy(&self, bucket: &str) -> StorageResult<()> {
        self.remove_bucket(bucket)
            .await
            .map_err(|e| self.fail("bucket_destroy", e))
    }

    fn urls(&self) -> &UrlSchemes {
        &self.urls
    }

    fn backend_type(&self) -> StorageBackend {
        self.client.backend_type()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }
}
