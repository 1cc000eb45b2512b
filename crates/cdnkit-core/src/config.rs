//! Configuration module
//!
//! Per-deployment settings for the storage drivers: which backend, which physical
//! bucket for the current environment, credentials, the four base URIs, the local
//! cache directory and the secret used for expiring links.

use std::collections::HashMap;
use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;

use crate::storage_types::{to_https, StorageBackend};

const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_SITE_URL: &str = "http://localhost";
const DEFAULT_CACHE_DIR_NAME: &str = "cdnkit-cache";

/// What `bucket_destroy` does with a bucket that still holds objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketDestroyPolicy {
    /// Fail with a "bucket not empty" error.
    #[default]
    RefuseNonEmpty,
    /// Delete every object under the bucket, then the bucket itself.
    Recursive,
}

impl FromStr for BucketDestroyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "refuse-non-empty" | "refuse" => Ok(BucketDestroyPolicy::RefuseNonEmpty),
            "recursive" => Ok(BucketDestroyPolicy::Recursive),
            _ => Err(anyhow::anyhow!("Invalid bucket destroy policy: {}", s)),
        }
    }
}

impl Display for BucketDestroyPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BucketDestroyPolicy::RefuseNonEmpty => write!(f, "refuse-non-empty"),
            BucketDestroyPolicy::Recursive => write!(f, "recursive"),
        }
    }
}

/// Base URIs after defaults have been applied. `{{bucket}}` is still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUris {
    pub serve: String,
    pub serve_secure: String,
    pub process: String,
    pub process_secure: String,
}

/// Storage driver configuration.
#[derive(Clone)]
pub struct CdnConfig {
    pub environment: String,
    pub backend: StorageBackend,
    /// Physical bucket/container for the current environment.
    pub bucket: Option<String>,
    /// GCS service-account key: a path to a key file, or the JSON itself.
    pub gcs_key_file: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub site_url: String,
    pub uri_serve: Option<String>,
    pub uri_serve_secure: Option<String>,
    pub uri_process: Option<String>,
    pub uri_process_secure: Option<String>,
    pub cache_dir: PathBuf,
    pub private_key: String,
    pub bucket_destroy_policy: BucketDestroyPolicy,
}

// Manual Debug so secrets never end up in logs.
impl std::fmt::Debug for CdnConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CdnConfig")
            .field("environment", &self.environment)
            .field("backend", &self.backend)
            .field("bucket", &self.bucket)
            .field("gcs_key_file", &self.gcs_key_file.as_ref().map(|_| "<redacted>"))
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("local_storage_path", &self.local_storage_path)
            .field("site_url", &self.site_url)
            .field("uri_serve", &self.uri_serve)
            .field("uri_serve_secure", &self.uri_serve_secure)
            .field("uri_process", &self.uri_process)
            .field("uri_process_secure", &self.uri_process_secure)
            .field("cache_dir", &self.cache_dir)
            .field("private_key", &"<redacted>")
            .field("bucket_destroy_policy", &self.bucket_destroy_policy)
            .finish()
    }
}

impl CdnConfig {
    /// A local-filesystem configuration with defaults for everything else.
    pub fn local(
        storage_path: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            backend: StorageBackend::Local,
            bucket: None,
            gcs_key_file: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some(storage_path.into()),
            site_url: DEFAULT_SITE_URL.to_string(),
            uri_serve: None,
            uri_serve_secure: None,
            uri_process: None,
            uri_process_secure: None,
            cache_dir: cache_dir.into(),
            private_key: private_key.into(),
            bucket_destroy_policy: BucketDestroyPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment =
            non_empty("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let backend = match non_empty("CDN_DRIVER") {
            Some(s) => s.parse()?,
            None => StorageBackend::Local,
        };

        let bucket = resolve_bucket(&environment, &non_empty)?;

        let bucket_destroy_policy = match non_empty("CDN_BUCKET_DESTROY_POLICY") {
            Some(s) => s.parse()?,
            None => BucketDestroyPolicy::default(),
        };

        let cache_dir = non_empty("CDN_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join(DEFAULT_CACHE_DIR_NAME));

        let config = CdnConfig {
            environment,
            backend,
            bucket,
            gcs_key_file: non_empty("CDN_GCS_KEY_FILE"),
            s3_region: non_empty("CDN_S3_REGION").or_else(|| non_empty("AWS_REGION")),
            s3_endpoint: non_empty("CDN_S3_ENDPOINT"),
            local_storage_path: non_empty("CDN_LOCAL_PATH"),
            site_url: non_empty("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            uri_serve: non_empty("CDN_URI_SERVE"),
            uri_serve_secure: non_empty("CDN_URI_SERVE_SECURE"),
            uri_process: non_empty("CDN_URI_PROCESS"),
            uri_process_secure: non_empty("CDN_URI_PROCESS_SECURE"),
            cache_dir,
            private_key: non_empty("CDN_PRIVATE_KEY")
                .ok_or_else(|| anyhow::anyhow!("CDN_PRIVATE_KEY must be set"))?,
            bucket_destroy_policy,
        };

        config.validate()?;

        tracing::debug!(
            environment = %config.environment,
            backend = %config.backend,
            bucket = ?config.bucket,
            "CDN configuration loaded"
        );

        Ok(config)
    }

    /// Check that the settings the selected backend needs are present.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.private_key.is_empty() {
            anyhow::bail!("CDN_PRIVATE_KEY must be set");
        }

        match self.backend {
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    anyhow::bail!("CDN_LOCAL_PATH must be set for the local driver");
                }
            }
            StorageBackend::S3 => {
                self.require_bucket()?;
                if self.s3_region.is_none() {
                    anyhow::bail!("CDN_S3_REGION or AWS_REGION must be set for the s3 driver");
                }
            }
            StorageBackend::Gcs => {
                self.require_bucket()?;
                if self.gcs_key_file.is_none() {
                    anyhow::bail!("CDN_GCS_KEY_FILE must be set for the gcs driver");
                }
            }
        }

        Ok(())
    }

    fn require_bucket(&self) -> Result<&str, anyhow::Error> {
        self.bucket.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "CDN_BUCKET_{} (or an entry in CDN_BUCKETS) must be set for the {} driver",
                self.environment.to_uppercase(),
                self.backend
            )
        })
    }

    /// Physical bucket name substituted for `{{bucket}}` in base URIs.
    pub fn container(&self) -> &str {
        self.bucket.as_deref().unwrap_or("")
    }

    /// The four base URIs, falling back to the backend's defaults.
    pub fn resolved_uris(&self) -> ResolvedUris {
        let process_default = format!("{}/cdn", self.site_url.trim_end_matches('/'));
        let process_secure_default = to_https(&process_default);

        ResolvedUris {
            serve: self
                .uri_serve
                .clone()
                .unwrap_or_else(|| self.backend.default_serve_uri(&self.site_url)),
            serve_secure: self
                .uri_serve_secure
                .clone()
                .unwrap_or_else(|| self.backend.default_serve_secure_uri(&self.site_url)),
            process: self.uri_process.clone().unwrap_or(process_default),
            process_secure: self
                .uri_process_secure
                .clone()
                .unwrap_or(process_secure_default),
        }
    }
}

/// `CDN_BUCKET_<ENV>` wins; otherwise look the environment up in the `CDN_BUCKETS` JSON map.
fn resolve_bucket<F>(environment: &str, lookup: &F) -> Result<Option<String>, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let env_key = environment.to_uppercase();

    if let Some(bucket) = lookup(&format!("CDN_BUCKET_{}", env_key)) {
        return Ok(Some(bucket));
    }

    let Some(raw) = lookup("CDN_BUCKETS") else {
        return Ok(None);
    };

    let buckets: HashMap<String, String> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("CDN_BUCKETS must be a JSON object: {}", e))?;

    Ok(buckets
        .into_iter()
        .find(|(env, _)| env.to_uppercase() == env_key)
        .map(|(_, bucket)| bucket))
}
