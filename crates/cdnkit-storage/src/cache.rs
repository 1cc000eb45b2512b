//! Local cache of object source files.
//!
//! Processing steps (crop, scale, ...) need the original bytes on disk. The cache
//! keeps one file per object at `{cache_dir}/{bucket}-{filename}-SRC{ext}` and only
//! goes to the backend when that file is missing. Entries are never invalidated here.

use std::path::{Path, PathBuf};

use cdnkit_core::naming::{cache_file_name, object_keys};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::traits::{BlobClient, StorageError, StorageResult};

/// Directory of cached object source files, shared by every driver instance.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub async fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();

        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self { dir })
    }

    /// Where the cached copy of an object lives, whether or not it exists yet.
    pub fn path_for(&self, bucket: &str, filename: &str) -> PathBuf {
        self.dir.join(cache_file_name(bucket, filename))
    }

    /// Return the cached copy of an object, downloading its primary artifact on a miss.
    ///
    /// The download is written to a private temporary file and renamed into place, so
    /// a failed fetch never leaves a partial file at the cache path. If the rename
    /// fails but another caller has already cached the object, that copy is used.
    pub async fn resolve(
        &self,
        client: &dyn BlobClient,
        bucket: &str,
        filename: &str,
    ) -> StorageResult<PathBuf> {
        let path = self.path_for(bucket, filename);

        if fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "Local cache hit");
            return Ok(path);
        }

        let key = object_keys(bucket, filename).primary;
        let data = client.download(&key).await?;

        let temp = self.dir.join(format!(
            ".{}.{}.part",
            cache_file_name(bucket, filename),
            Uuid::new_v4()
        ));

        if let Err(e) = write_file(&temp, &data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::DownloadFailed(format!(
                "Failed to write cache file {}: {}",
                temp.display(),
                e
            )));
        }

        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            if fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(path);
            }
            return Err(StorageError::DownloadFailed(format!(
                "Failed to move cache file into {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            key = %key,
            path = %path.display(),
            size_bytes = data.len(),
            "Local cache filled"
        );

        Ok(path)
    }
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}
