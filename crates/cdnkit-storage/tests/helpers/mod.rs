#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use cdnkit_core::{BaseUris, BucketDestroyPolicy, EncryptionService, ExpiringLinkIssuer, UrlSchemes};
use cdnkit_storage::{
    BackendDriver, BlobClient, LocalCache, LocalClient, NewObject, ObjectMetadata,
    StorageBackend, StorageError, StorageResult,
};
use tempfile::TempDir;

pub const SERVE: &str = "http://cdn.example.com";
pub const SERVE_SECURE: &str = "https://cdn.example.com";
pub const PROCESS: &str = "http://example.com/cdn";
pub const PROCESS_SECURE: &str = "https://example.com/cdn";

/// Wraps a client, counting calls and optionally failing selected operations.
pub struct RecordingClient {
    inner: LocalClient,
    pub uploads: AtomicUsize,
    pub copies: AtomicUsize,
    pub deletes: AtomicUsize,
    pub downloads: AtomicUsize,
    pub exists_checks: AtomicUsize,
    pub fail_copy: AtomicBool,
    pub fail_exists: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl RecordingClient {
    pub fn new(inner: LocalClient) -> Self {
        Self {
            inner,
            uploads: AtomicUsize::new(0),
            copies: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            exists_checks: AtomicUsize::new(0),
            fail_copy: AtomicBool::new(false),
            fail_exists: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobClient for RecordingClient {
    async fn upload(&self, key: &str, data: Bytes, metadata: &ObjectMetadata) -> StorageResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(key, data, metadata).await
    }

    async fn copy(
        &self,
        from_key: &str,
        to_key: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(StorageError::CopyFailed("permission denied".to_string()));
        }
        self.inner.copy(from_key, to_key, metadata).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("permission denied".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.exists_checks.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("connection refused".to_string()));
        }
        self.inner.exists(key).await
    }

    async fn download(&self, key: &str) -> StorageResult<Bytes> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.inner.download(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

/// A driver over a recording local client, with its scratch directories.
pub struct TestDriver {
    pub driver: BackendDriver,
    pub client: Arc<RecordingClient>,
    pub store_dir: TempDir,
    pub cache_dir: TempDir,
    pub source_dir: TempDir,
}

impl TestDriver {
    pub async fn new(policy: BucketDestroyPolicy) -> Self {
        let store_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let source_dir = tempfile::tempdir().unwrap();

        let client = Arc::new(RecordingClient::new(
            LocalClient::new(store_dir.path()).await.unwrap(),
        ));
        let cache = LocalCache::new(cache_dir.path()).await.unwrap();

        let driver = BackendDriver::new(client.clone(), cache, url_schemes(), policy);

        Self {
            driver,
            client,
            store_dir,
            cache_dir,
            source_dir,
        }
    }

    /// Write a source file to upload from.
    pub fn source(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.source_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn new_object(&self, bucket: &str, filename: &str, contents: &[u8]) -> NewObject {
        NewObject {
            bucket: bucket.to_string(),
            source: self.source(filename, contents),
            filename: filename.to_string(),
            mime: "image/png".to_string(),
            display_name: Some("My Pic.png".to_string()),
        }
    }

    pub fn stored(&self, key: &str) -> bool {
        self.store_dir.path().join(key).is_file()
    }

    pub fn cache_entries(&self) -> usize {
        count_files(self.cache_dir.path())
    }
}

pub fn url_schemes() -> UrlSchemes {
    let bases = BaseUris::new(SERVE, SERVE_SECURE, PROCESS, PROCESS_SECURE, "physical");
    let cipher = Arc::new(EncryptionService::from_secret("test-secret").unwrap());
    UrlSchemes::new(bases, ExpiringLinkIssuer::new(cipher))
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|entry| entry.as_ref().unwrap().path().is_file())
        .count()
}

/// Formatted log output collected by a test subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Install a subscriber writing into this buffer for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
