//! Object naming policy.
//!
//! Derives every key a backend stores for a logical `(bucket, filename)` pair, and the
//! file name the local cache uses for it. All backends go through here so that
//! switching backends never orphans existing objects.

/// Suffix appended to the stem of the attachment copy of an object.
pub const DOWNLOAD_SUFFIX: &str = "-download";

/// Suffix appended to the stem of a locally cached source file.
pub const CACHE_SUFFIX: &str = "-SRC";

/// Name of the empty marker object recording that a bucket exists.
pub const BUCKET_MARKER: &str = ".bucket";

/// Content type forced onto the download artifact.
pub const DOWNLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// A filename split at its last `.` and lower-cased.
///
/// The extension keeps its leading dot. A filename without a dot has an empty
/// extension rather than being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    stem: String,
    extension: String,
}

impl ObjectName {
    pub fn parse(filename: &str) -> Self {
        let (stem, extension) = match filename.rfind('.') {
            Some(idx) => filename.split_at(idx),
            None => (filename, ""),
        };

        Self {
            stem: stem.to_lowercase(),
            extension: extension.to_lowercase(),
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Extension including the leading dot, or `""`.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// The two backend keys every object is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeys {
    pub primary: String,
    pub download: String,
}

/// Derive the primary and download keys for an object.
pub fn object_keys(bucket: &str, filename: &str) -> ObjectKeys {
    let name = ObjectName::parse(filename);
    ObjectKeys {
        primary: format!("{}/{}{}", bucket, name.stem(), name.extension()),
        download: format!(
            "{}/{}{}{}",
            bucket,
            name.stem(),
            DOWNLOAD_SUFFIX,
            name.extension()
        ),
    }
}

/// Cache file name for an object: `{bucket}-{filename}-SRC{ext}`.
///
/// Uses `-` rather than `/` so the cache directory stays flat. A `/` inside the bucket
/// or filename is written as `%2F`.
pub fn cache_file_name(bucket: &str, filename: &str) -> String {
    let name = ObjectName::parse(filename);
    format!(
        "{}-{}{}{}",
        bucket,
        name.stem(),
        CACHE_SUFFIX,
        name.extension()
    )
    .replace('/', "%2F")
}

/// Prefix under which every key of a bucket lives.
pub fn bucket_prefix(bucket: &str) -> String {
    format!("{}/", bucket)
}

pub fn bucket_marker_key(bucket: &str) -> String {
    format!("{}/{}", bucket, BUCKET_MARKER)
}

/// Whether `filename` would be stored on top of the bucket's marker object.
pub fn is_reserved_name(bucket: &str, filename: &str) -> bool {
    object_keys(bucket, filename).primary == bucket_marker_key(bucket)
}

/// `Content-Disposition` value forcing a "Save As" with the given display name.
///
/// Double quotes are stripped from the name so they cannot terminate the quoted value.
pub fn download_disposition(display_name: &str) -> String {
    format!("attachment; filename=\"{}\"", display_name.replace('"', ""))
}

/// Display name used when the caller supplies none: `file{ext}`.
pub fn default_display_name(filename: &str) -> String {
    format!("file{}", ObjectName::parse(filename).extension())
}
