//! Encryption service for expiring-link tokens

use crate::AppError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

/// Symmetric encryption plus keyed digests derived from one application secret.
/// Uses AES-256-GCM for authenticated encryption and HMAC-SHA256 for digests.
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
    mac_key: Vec<u8>,
}

impl EncryptionService {
    /// Create a new encryption service from raw 32-byte key (e.g. for tests).
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        if key_bytes.len() != 32 {
            return Err(AppError::Encryption(
                "Encryption key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
            mac_key: key_bytes.to_vec(),
        })
    }

    /// Create a service from an application secret of any length.
    ///
    /// The AES key is the SHA-256 of the secret; the HMAC key is the secret itself.
    pub fn from_secret(secret: &str) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::Config("Private key must not be empty".to_string()));
        }
        let key_bytes = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
            mac_key: secret.as_bytes().to_vec(),
        })
    }

    /// Encrypt a plaintext string
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

        // Combine nonce and ciphertext, then base64 encode
        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(general_purpose::STANDARD.encode(&combined))
    }

    /// Decrypt an encrypted string
    pub fn decrypt(&self, encrypted: &str) -> Result<String, AppError> {
        let combined = general_purpose::STANDARD
            .decode(encrypted)
            .map_err(|e| AppError::Encryption(format!("Failed to decode encrypted data: {}", e)))?;

        if combined.len() < NONCE_LEN {
            return Err(AppError::Encryption("Encrypted data too short".to_string()));
        }

        let nonce = Nonce::from_slice(&combined[..NONCE_LEN]);
        let ciphertext = &combined[NONCE_LEN..];

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Encryption(format!("Invalid UTF-8 in decrypted data: {}", e)))
    }

    /// Hex-encoded HMAC-SHA256 over `parts` joined with `|`.
    pub fn keyed_digest(&self, parts: &[&str]) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key)
            .expect("HMAC can take key of any size");
        mac.update(parts.join("|").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> EncryptionService {
        let test_key = b"01234567890123456789012345678901";
        EncryptionService::from_key_bytes(test_key).unwrap()
    }

    #[test]
    fn test_encryption_decryption() {
        let service = test_service();
        let plaintext = "avatars|pic.png|60|1700000000|abc";

        let encrypted = service.encrypt(plaintext).unwrap();
        assert_ne!(encrypted, plaintext);

        let decrypted = service.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encryption_uses_fresh_nonce() {
        let service = EncryptionService::from_secret("s3cret").unwrap();
        let a = service.encrypt("same").unwrap();
        let b = service.encrypt("same").unwrap();
        assert_ne!(a, b);
        assert_eq!(service.decrypt(&a).unwrap(), service.decrypt(&b).unwrap());
    }

    #[test]
    fn test_wrong_secret_cannot_decrypt() {
        let a = EncryptionService::from_secret("one").unwrap();
        let b = EncryptionService::from_secret("two").unwrap();
        let encrypted = a.encrypt("payload").unwrap();
        assert!(matches!(b.decrypt(&encrypted), Err(AppError::Encryption(_))));
    }

    #[test]
    fn test_short_ciphertext_rejected() {
        let service = test_service();
        let short = general_purpose::STANDARD.encode([0u8; 4]);
        assert!(service.decrypt(&short).is_err());
    }

    #[test]
    fn test_keyed_digest_depends_on_secret() {
        let a = EncryptionService::from_secret("one").unwrap();
        let b = EncryptionService::from_secret("two").unwrap();
        let parts = ["1700000000", "avatars", "pic.png", "60"];

        assert_eq!(a.keyed_digest(&parts), a.keyed_digest(&parts));
        assert_ne!(a.keyed_digest(&parts), b.keyed_digest(&parts));
        assert_eq!(a.keyed_digest(&parts).len(), 64);
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            EncryptionService::from_secret(""),
            Err(AppError::Config(_))
        ));
    }
}
