//! Encryption at rest for OAuth tokens of connected social accounts.
//!
//! Tokens are sealed with AES-256-GCM using a fresh 96-bit nonce per value.
//! The stored form is `base64(nonce || ciphertext)`, which fits a TEXT column.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::sync::Arc;

use crate::error::AppError;

const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher shared across handlers.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Arc<Aes256Gcm>,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Build a cipher from a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, AppError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| AppError::internal(format!("Invalid AES-256-GCM key: {e}")))?;

        Ok(Self {
            cipher: Arc::new(cipher),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::internal(format!("Encryption failed: {e}")))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    pub fn decrypt(&self, sealed: &str) -> Result<String, AppError> {
        let bytes = STANDARD
            .decode(sealed)
            .map_err(|e| AppError::internal(format!("Stored token is not base64: {e}")))?;

        if bytes.len() <= NONCE_LEN {
            return Err(AppError::internal("Stored token is truncated"));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| AppError::internal(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::internal(format!("Decrypted token is not UTF-8: {e}")))
    }

    /// Encrypt an optional value, passing `None` through.
    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> Result<Option<String>, AppError> {
        plaintext.map(|p| self.encrypt(p)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn sealed_value_opens_with_same_key() {
        let cipher = cipher();
        let sealed = cipher.encrypt("EAAB-access-token").unwrap();
        assert_ne!(sealed, "EAAB-access-token");
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "EAAB-access-token");
    }

    #[test]
    fn nonces_differ_between_encryptions() {
        let cipher = cipher();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = cipher().encrypt("secret").unwrap();
        let other = TokenCipher::new(&[8u8; 32]).unwrap();
        assert!(other.decrypt(&sealed).is_err());
    }

    #[test]
    fn rejects_short_keys_and_garbage() {
        assert!(TokenCipher::new(&[1u8; 16]).is_err());
        assert!(cipher().decrypt("not base64 !!").is_err());
        assert!(cipher().decrypt(&STANDARD.encode([0u8; 8])).is_err());
    }
}
