// src/services/encryption.rs
//! AES-256-GCM encryption for provider tokens at rest.
//!
//! LinkedIn access and refresh tokens are secret credentials scoped to one
//! external account and must never hit the users table in plaintext. Each
//! value is encrypted with a random nonce, stored as base64(nonce || ciphertext).

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption key not configured")]
    KeyNotConfigured,

    #[error("Invalid encryption key format")]
    InvalidKeyFormat,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid encrypted data format")]
    InvalidDataFormat,
}

pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("cipher", &"<redacted>")
            .finish()
    }
}

impl EncryptionService {
    /// Initialize encryption service from the ENCRYPTION_MASTER_KEY
    /// environment variable (base64-encoded 32-byte key)
    pub fn from_env() -> Result<Self, EncryptionError> {
        let key_str =
            env::var("ENCRYPTION_MASTER_KEY").map_err(|_| EncryptionError::KeyNotConfigured)?;

        Self::from_key(&key_str)
    }

    /// Initialize encryption service from a base64-encoded key string
    pub fn from_key(key_str: &str) -> Result<Self, EncryptionError> {
        let key_bytes = BASE64
            .decode(key_str.as_bytes())
            .map_err(|_| EncryptionError::InvalidKeyFormat)?;

        // AES-256 requires exactly 32 key bytes
        if key_bytes.len() != 32 {
            return Err(EncryptionError::InvalidKeyFormat);
        }

        let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&key_bytes);
        let cipher = Aes256Gcm::new(key);

        Ok(Self { cipher })
    }

    /// Generate a new random encryption key (base64-encoded)
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Encrypt a plaintext token and return base64(nonce || ciphertext)
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        // 12-byte nonce per GCM invocation, never reused
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a base64(nonce || ciphertext) value back to the plaintext token
    pub fn decrypt(&self, encrypted: &str) -> Result<String, EncryptionError> {
        let combined = BASE64
            .decode(encrypted.as_bytes())
            .map_err(|_| EncryptionError::InvalidDataFormat)?;

        if combined.len() < 12 {
            return Err(EncryptionError::InvalidDataFormat);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext_bytes)
            .map_err(|_| EncryptionError::DecryptionFailed("invalid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::from_key(&key).unwrap();

        let token = "AQVzE5nF8kWm2pQr7sTx9yLb";
        let encrypted = service.encrypt(token).unwrap();

        assert_ne!(encrypted, token);
        assert_eq!(service.decrypt(&encrypted).unwrap(), token);
    }

    #[test]
    fn test_random_nonce_means_distinct_ciphertexts() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::from_key(&key).unwrap();

        let encrypted1 = service.encrypt("same_token").unwrap();
        let encrypted2 = service.encrypt("same_token").unwrap();

        assert_ne!(encrypted1, encrypted2);
        assert_eq!(service.decrypt(&encrypted1).unwrap(), "same_token");
        assert_eq!(service.decrypt(&encrypted2).unwrap(), "same_token");
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(EncryptionService::from_key("not-base64!").is_err());
        // Right encoding, wrong length
        let short_key = BASE64.encode([0u8; 16]);
        assert!(EncryptionService::from_key(&short_key).is_err());
    }

    #[test]
    fn test_decrypt_garbage_fails() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::from_key(&key).unwrap();

        assert!(service.decrypt("garbage").is_err());
    }
}
