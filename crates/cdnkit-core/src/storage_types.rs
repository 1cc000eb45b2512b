use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Selects which physical backend a driver talks to. Defined in core because the
/// configuration layer picks per-backend URI defaults from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
    Gcs,
}

impl StorageBackend {
    /// Default insecure serving URI; `{{bucket}}` is the physical bucket.
    pub fn default_serve_uri(&self, site_url: &str) -> String {
        match self {
            StorageBackend::Local => format!("{}/cdn/serve", site_url.trim_end_matches('/')),
            StorageBackend::S3 => "http://{{bucket}}.s3.amazonaws.com".to_string(),
            StorageBackend::Gcs => "http://{{bucket}}.storage.googleapis.com".to_string(),
        }
    }

    /// Default secure serving URI.
    pub fn default_serve_secure_uri(&self, site_url: &str) -> String {
        match self {
            StorageBackend::Local => {
                format!("{}/cdn/serve", to_https(site_url).trim_end_matches('/'))
            }
            StorageBackend::S3 => "https://{{bucket}}.s3.amazonaws.com".to_string(),
            StorageBackend::Gcs => "https://{{bucket}}.storage.googleapis.com".to_string(),
        }
    }
}

/// Swap a leading `http://` for `https://`; anything else is returned as-is.
pub fn to_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            "gcs" | "google" => Ok(StorageBackend::Gcs),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Gcs => write!(f, "gcs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("GCS".parse::<StorageBackend>().unwrap(), StorageBackend::Gcs);
        assert_eq!("google".parse::<StorageBackend>().unwrap(), StorageBackend::Gcs);
        assert_eq!("s3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert!("nfs".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn local_defaults_follow_site_url() {
        let backend = StorageBackend::Local;
        assert_eq!(
            backend.default_serve_uri("http://example.com/"),
            "http://example.com/cdn/serve"
        );
        assert_eq!(
            backend.default_serve_secure_uri("http://example.com"),
            "https://example.com/cdn/serve"
        );
    }

    #[test]
    fn to_https_leaves_other_schemes_alone() {
        assert_eq!(to_https("https://a.b"), "https://a.b");
        assert_eq!(to_https("ftp://a.b"), "ftp://a.b");
    }
}
