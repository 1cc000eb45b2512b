#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
use crate::ObjectStoreClient;
#[cfg(feature = "storage-local")]
use crate::LocalClient;
use crate::{
    BackendDriver, BlobClient, LocalCache, StorageBackend, StorageDriver, StorageError,
    StorageResult,
};
use cdnkit_core::{BaseUris, CdnConfig, EncryptionService, ExpiringLinkIssuer, UrlSchemes};
use std::sync::Arc;

/// Create a storage driver based on configuration
pub async fn create_driver(config: &CdnConfig) -> StorageResult<Arc<dyn StorageDriver>> {
    config
        .validate()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    let client = create_client(config).await?;
    let cache = LocalCache::new(config.cache_dir.clone()).await?;
    let urls = create_url_schemes(config)?;

    tracing::info!(
        backend = %config.backend,
        bucket = %config.container(),
        environment = %config.environment,
        "Storage driver ready"
    );

    Ok(Arc::new(BackendDriver::new(
        client,
        cache,
        urls,
        config.bucket_destroy_policy,
    )))
}

/// URL generators for the configured base URIs and private key.
pub fn create_url_schemes(config: &CdnConfig) -> StorageResult<UrlSchemes> {
    let uris = config.resolved_uris();
    let bases = BaseUris::new(
        &uris.serve,
        &uris.serve_secure,
        &uris.process,
        &uris.process_secure,
        config.container(),
    );
    let cipher = EncryptionService::from_secret(&config.private_key)?;

    Ok(UrlSchemes::new(bases, ExpiringLinkIssuer::new(Arc::new(cipher))))
}

async fn create_client(config: &CdnConfig) -> StorageResult<Arc<dyn BlobClient>> {
    match config.backend {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("CDN_LOCAL_PATH not configured".to_string())
            })?;
            Ok(Arc::new(LocalClient::new(base_path).await?))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = required_bucket(config)?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("CDN_S3_REGION or AWS_REGION not configured".to_string())
            })?;
            Ok(Arc::new(ObjectStoreClient::s3(
                bucket,
                region,
                config.s3_endpoint.clone(),
            )?))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-gcs")]
        StorageBackend::Gcs => {
            let bucket = required_bucket(config)?;
            let key_file = config.gcs_key_file.as_deref().ok_or_else(|| {
                StorageError::ConfigError("CDN_GCS_KEY_FILE not configured".to_string())
            })?;
            Ok(Arc::new(ObjectStoreClient::gcs(bucket, key_file)?))
        }

        #[cfg(not(feature = "storage-gcs"))]
        StorageBackend::Gcs => Err(StorageError::ConfigError(
            "GCS storage backend not available (storage-gcs feature not enabled)".to_string(),
        )),
    }
}

#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
fn required_bucket(config: &CdnConfig) -> StorageResult<String> {
    config.bucket.clone().ok_or_else(|| {
        StorageError::ConfigError(format!(
            "CDN_BUCKET_{} not configured",
            config.environment.to_uppercase()
        ))
    })
}
