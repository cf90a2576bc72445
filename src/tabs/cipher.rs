//! Optional AES-256-GCM encryption of tab content at rest.
//!
//! Sealed content is stored as `enc:v1:` followed by
//! base64(nonce || ciphertext || auth_tag). Anything without the prefix is
//! treated as plaintext written before encryption was enabled.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

pub const SEALED_PREFIX: &str = "enc:v1:";

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),
    #[error("Encryption failed: {0}")]
    Encrypt(String),
    #[error("Decryption failed: {0}")]
    Decrypt(String),
    #[error("Content is encrypted but no encryption key is configured")]
    MissingKey,
}

#[derive(Clone, Default)]
pub struct ContentCipher {
    key: Option<[u8; KEY_SIZE]>,
}

impl std::fmt::Debug for ContentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCipher")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ContentCipher {
    /// A cipher that stores content as plaintext.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build a cipher from a 64 character hex key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(key_hex.trim()).map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            CipherError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Self { key: Some(key) })
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Prepare content for storage. Returns it unchanged when disabled.
    pub fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
        let Some(key) = &self.key else {
            return Ok(plaintext.to_string());
        };

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(format!("{SEALED_PREFIX}{}", BASE64.encode(&sealed)))
    }

    /// Recover stored content. Unprefixed content passes through as-is.
    pub fn open(&self, stored: &str) -> Result<String, CipherError> {
        let Some(encoded) = stored.strip_prefix(SEALED_PREFIX) else {
            return Ok(stored.to_string());
        };
        let key = self.key.as_ref().ok_or(CipherError::MissingKey)?;

        let sealed = BASE64
            .decode(encoded)
            .map_err(|e| CipherError::Decrypt(format!("Base64 decode failed: {e}")))?;
        if sealed.len() < NONCE_SIZE + 1 {
            return Err(CipherError::Decrypt(
                "Invalid encrypted data format".to_string(),
            ));
        }

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CipherError::Decrypt(e.to_string()))?;
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CipherError::Decrypt(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CipherError::Decrypt(e.to_string()))
    }
}
