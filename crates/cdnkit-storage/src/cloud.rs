use crate::traits::{BlobClient, ObjectMetadata, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::sync::Arc;

/// Cloud blob store backend (S3 or Google Cloud Storage) built on `object_store`.
///
/// Content type and disposition travel as object attributes. Public readability is
/// a property of the bucket's access policy, not of individual writes.
#[derive(Clone)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    backend: StorageBackend,
    bucket: String,
}

impl ObjectStoreClient {
    /// Wrap an already-built store, e.g. `object_store::memory::InMemory` in tests.
    pub fn new(store: Arc<dyn ObjectStore>, backend: StorageBackend, bucket: String) -> Self {
        Self {
            store,
            backend,
            bucket,
        }
    }

    /// Create an S3 client
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    #[cfg(feature = "storage-s3")]
    pub fn s3(bucket: String, region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        use object_store::aws::AmazonS3Builder;

        // Credentials come from the standard AWS environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("S3 client: {}", e)))?;

        Ok(Self::new(Arc::new(store), StorageBackend::S3, bucket))
    }

    /// Create a Google Cloud Storage client.
    ///
    /// `key_file` is either a path to a service-account key file or the key's JSON.
    #[cfg(feature = "storage-gcs")]
    pub fn gcs(bucket: String, key_file: &str) -> StorageResult<Self> {
        use object_store::gcp::GoogleCloudStorageBuilder;

        let builder = GoogleCloudStorageBuilder::new().with_bucket_name(bucket.clone());
        let builder = if std::path::Path::new(key_file).is_file() {
            builder.with_service_account_path(key_file)
        } else {
            builder.with_service_account_key(key_file)
        };

        // Builder errors may echo their input; keep the key out of the message.
        let store = builder.build().map_err(|_| {
            StorageError::ConfigError(
                "GCS client: invalid service account key or bucket".to_string(),
            )
        })?;

        Ok(Self::new(Arc::new(store), StorageBackend::Gcs, bucket))
    }

    fn attributes(metadata: &ObjectMetadata) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(content_type) = &metadata.content_type {
            attributes.insert(Attribute::ContentType, content_type.clone().into());
        }
        if let Some(disposition) = &metadata.content_disposition {
            attributes.insert(Attribute::ContentDisposition, disposition.clone().into());
        }
        attributes
    }

    async fn put(&self, key: &str, data: Bytes, metadata: &ObjectMetadata) -> ObjectResult<()> {
        let options = PutOptions {
            attributes: Self::attributes(metadata),
            ..Default::default()
        };
        self.store
            .put_opts(&Path::from(key), PutPayload::from(data), options)
            .await
            .map(|_| ())
    }

    async fn fetch(&self, key: &str) -> StorageResult<Bytes> {
        let result = self.store.get(&Path::from(key)).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))
    }
}

#[async_trait]
impl BlobClient for ObjectStoreClient {
    async fn upload(&self, key: &str, data: Bytes, metadata: &ObjectMetadata) -> StorageResult<()> {
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        self.put(key, data, metadata).await.map_err(|e| {
            tracing::error!(
                error = %e,
                backend = %self.backend,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Blob upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            backend = %self.backend,
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob upload successful"
        );

        Ok(())
    }

    async fn copy(
        &self,
        from_key: &str,
        to_key: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();

        if *metadata == ObjectMetadata::default() {
            self.store
                .copy(&Path::from(from_key), &Path::from(to_key))
                .await
                .map_err(|e| match e {
                    ObjectStoreError::NotFound { .. } => {
                        StorageError::NotFound(from_key.to_string())
                    }
                    other => StorageError::CopyFailed(other.to_string()),
                })?;
        } else {
            // A server-side copy keeps the source's attributes, so rewrite the object.
            let data = self.fetch(from_key).await?;
            self.put(to_key, data, metadata).await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    from_key = %from_key,
                    to_key = %to_key,
                    "Blob copy failed"
                );
                StorageError::CopyFailed(e.to_string())
            })?;
        }

        tracing::info!(
            backend = %self.backend,
            bucket = %self.bucket,
            from_key = %from_key,
            to_key = %to_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob copy successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        match self.store.delete(&Path::from(key)).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Blob delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            backend = %self.backend,
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.store.head(&Path::from(key)).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn download(&self, key: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let data = self.fetch(key).await?;

        tracing::info!(
            backend = %self.backend,
            bucket = %self.bucket,
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob download successful"
        );

        Ok(data)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let location = Path::from(prefix.trim_end_matches('/'));
        let objects: Vec<_> = self
            .store
            .list(Some(&location))
            .try_collect()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let mut keys: Vec<String> = objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn client() -> ObjectStoreClient {
        ObjectStoreClient::new(
            Arc::new(InMemory::new()),
            StorageBackend::Gcs,
            "test-bucket".to_string(),
        )
    }

    #[tokio::test]
    async fn upload_download_and_exists() {
        let client = client();
        let data = Bytes::from_static(b"hello");

        client
            .upload("docs/a.txt", data.clone(), &ObjectMetadata::with_content_type("text/plain"))
            .await
            .unwrap();

        assert!(client.exists("docs/a.txt").await.unwrap());
        assert!(!client.exists("docs/b.txt").await.unwrap());
        assert_eq!(client.download("docs/a.txt").await.unwrap(), data);
    }

    #[tokio::test]
    async fn copy_with_metadata_applies_attributes() {
        let client = client();
        client
            .upload(
                "docs/a.txt",
                Bytes::from_static(b"hello"),
                &ObjectMetadata::with_content_type("text/plain"),
            )
            .await
            .unwrap();

        let metadata = ObjectMetadata {
            content_type: Some("application/octet-stream".to_string()),
            content_disposition: Some("attachment; filename=\"a.txt\"".to_string()),
        };
        client
            .copy("docs/a.txt", "docs/a-download.txt", &metadata)
            .await
            .unwrap();

        let result = client
            .store
            .get(&Path::from("docs/a-download.txt"))
            .await
            .unwrap();
        assert_eq!(
            result
                .attributes
                .get(&Attribute::ContentType)
                .map(AsRef::<str>::as_ref),
            Some("application/octet-stream")
        );
        assert_eq!(
            result
                .attributes
                .get(&Attribute::ContentDisposition)
                .map(AsRef::<str>::as_ref),
            Some("attachment; filename=\"a.txt\"")
        );
    }

    #[tokio::test]
    async fn missing_objects() {
        let client = client();

        assert!(client.delete("docs/none.txt").await.is_ok());
        assert!(matches!(
            client.download("docs/none.txt").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            client
                .copy("docs/none.txt", "docs/x.txt", &ObjectMetadata::with_content_type("a/b"))
                .await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let client = client();
        let meta = ObjectMetadata::default();
        for key in ["a/.bucket", "a/one.txt", "ab/two.txt"] {
            client.upload(key, Bytes::from_static(b"x"), &meta).await.unwrap();
        }

        assert_eq!(
            client.list("a/").await.unwrap(),
            vec!["a/.bucket".to_string(), "a/one.txt".to_string()]
        );
    }
}
