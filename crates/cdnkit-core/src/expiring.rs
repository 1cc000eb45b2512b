//! Expiring-link tokens.
//!
//! A token is `bucket|object|ttl|issued_at|digest`, where `digest` is a keyed digest
//! over `issued_at|bucket|object|ttl`. The whole string is encrypted with the same
//! secret before it is placed in a URL. The serving endpoint reverses this with
//! [`ExpiringToken::open`] and checks it with [`ExpiringToken::verify`].

use std::sync::Arc;

use chrono::Utc;

use crate::{AppError, EncryptionService};

const SEPARATOR: char = '|';

/// Secret-backed primitives the issuer relies on.
pub trait LinkCipher: Send + Sync {
    fn encode(&self, plaintext: &str) -> Result<String, AppError>;

    fn decode(&self, encoded: &str) -> Result<String, AppError>;

    /// Keyed digest over the given fields.
    fn digest(&self, parts: &[&str]) -> String;
}

impl LinkCipher for EncryptionService {
    fn encode(&self, plaintext: &str) -> Result<String, AppError> {
        self.encrypt(plaintext)
    }

    fn decode(&self, encoded: &str) -> Result<String, AppError> {
        self.decrypt(encoded)
    }

    fn digest(&self, parts: &[&str]) -> String {
        self.keyed_digest(parts)
    }
}

/// Decoded contents of an expiring-link token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringToken {
    pub bucket: String,
    pub object: String,
    pub ttl_secs: u64,
    pub issued_at: i64,
    pub digest: String,
}

impl ExpiringToken {
    /// Build a token issued at `issued_at` (unix seconds) and sign it.
    pub fn new(
        cipher: &dyn LinkCipher,
        bucket: &str,
        object: &str,
        ttl_secs: u64,
        issued_at: i64,
    ) -> Self {
        let digest = Self::compute_digest(cipher, bucket, object, ttl_secs, issued_at);
        Self {
            bucket: bucket.to_string(),
            object: object.to_string(),
            ttl_secs,
            issued_at,
            digest,
        }
    }

    fn compute_digest(
        cipher: &dyn LinkCipher,
        bucket: &str,
        object: &str,
        ttl_secs: u64,
        issued_at: i64,
    ) -> String {
        cipher.digest(&[
            &issued_at.to_string(),
            bucket,
            object,
            &ttl_secs.to_string(),
        ])
    }

    pub fn expires_at(&self) -> i64 {
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        self.issued_at.saturating_add(ttl)
    }

    /// The plaintext form, before encryption.
    pub fn payload(&self) -> String {
        format!(
            "{bucket}{s}{object}{s}{ttl}{s}{issued}{s}{digest}",
            bucket = self.bucket,
            object = self.object,
            ttl = self.ttl_secs,
            issued = self.issued_at,
            digest = self.digest,
            s = SEPARATOR
        )
    }

    /// Parse a plaintext payload.
    ///
    /// The bucket is everything before the first separator and the last three fields
    /// are fixed, so object keys may themselves contain the separator.
    pub fn parse(payload: &str) -> Result<Self, AppError> {
        let malformed = || AppError::InvalidToken("Malformed token payload".to_string());

        let (bucket, rest) = payload.split_once(SEPARATOR).ok_or_else(malformed)?;
        let mut tail = rest.rsplitn(4, SEPARATOR);
        let digest = tail.next().ok_or_else(malformed)?;
        let issued_at = tail.next().ok_or_else(malformed)?;
        let ttl = tail.next().ok_or_else(malformed)?;
        let object = tail.next().ok_or_else(malformed)?;

        Ok(Self {
            bucket: bucket.to_string(),
            object: object.to_string(),
            ttl_secs: ttl
                .parse()
                .map_err(|_| AppError::InvalidToken("Invalid ttl".to_string()))?,
            issued_at: issued_at
                .parse()
                .map_err(|_| AppError::InvalidToken("Invalid issue time".to_string()))?,
            digest: digest.to_string(),
        })
    }

    /// Decrypt and parse an encoded token (as found in a URL, already percent-decoded).
    pub fn open(cipher: &dyn LinkCipher, encoded: &str) -> Result<Self, AppError> {
        let payload = cipher.decode(encoded)?;
        Self::parse(&payload)
    }

    /// True when the digest matches and `now` is not past the expiry.
    pub fn verify(&self, cipher: &dyn LinkCipher, now: i64) -> bool {
        let expected = Self::compute_digest(
            cipher,
            &self.bucket,
            &self.object,
            self.ttl_secs,
            self.issued_at,
        );
        expected == self.digest && now <= self.expires_at()
    }
}

/// Issues encrypted expiring-link tokens.
#[derive(Clone)]
pub struct ExpiringLinkIssuer {
    cipher: Arc<dyn LinkCipher>,
}

impl ExpiringLinkIssuer {
    pub fn new(cipher: Arc<dyn LinkCipher>) -> Self {
        Self { cipher }
    }

    pub fn cipher(&self) -> &dyn LinkCipher {
        self.cipher.as_ref()
    }

    /// Encrypted token for `object` in `bucket`, valid for `ttl_secs` from now.
    pub fn issue(&self, bucket: &str, object: &str, ttl_secs: u64) -> Result<String, AppError> {
        self.issue_at(bucket, object, ttl_secs, Utc::now().timestamp())
    }

    pub fn issue_at(
        &self,
        bucket: &str,
        object: &str,
        ttl_secs: u64,
        issued_at: i64,
    ) -> Result<String, AppError> {
        if bucket.contains(SEPARATOR) {
            return Err(AppError::InvalidInput(format!(
                "Bucket slug may not contain '{}'",
                SEPARATOR
            )));
        }
        let token = ExpiringToken::new(self.cipher(), bucket, object, ttl_secs, issued_at);
        self.cipher.encode(&token.payload())
    }
}
