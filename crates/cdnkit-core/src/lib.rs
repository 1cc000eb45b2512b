//! cdnkit Core Library
//!
//! This crate provides the pieces of the content-storage layer that do not touch a
//! backend: configuration, error types, object naming, URL templating and the
//! expiring-link token format. Every storage driver shares them, so switching
//! backends never changes an object's keys or its public URLs.
//!
//! # Object key format
//!
//! Every stored object exists as two artifacts sharing a base key:
//!
//! - **Primary**: `{bucket}/{filename}{extension}` (served inline)
//! - **Download**: `{bucket}/{filename}-download{extension}` (served as an attachment)
//!
//! The filename and extension are lower-cased; the bucket slug never is. Key
//! derivation lives in the `naming` module.

pub mod config;
pub mod encryption;
pub mod error;
pub mod expiring;
pub mod naming;
pub mod storage_types;
pub mod template;
pub mod urls;

// Re-export commonly used types
pub use config::{BucketDestroyPolicy, CdnConfig, ResolvedUris};
pub use encryption::EncryptionService;
pub use error::AppError;
pub use expiring::{ExpiringLinkIssuer, ExpiringToken, LinkCipher};
pub use naming::{ObjectKeys, ObjectName};
pub use storage_types::StorageBackend;
pub use template::{Placeholder, TemplateVars};
pub use urls::{BaseUris, Family, RequestSecurity, SchemeUrls, UrlSchemes};
