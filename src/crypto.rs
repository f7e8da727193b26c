//! Refresh-token-at-rest encryption
//!
//! The refresh token stored in the session cookie is encrypted with
//! AES-256-GCM. The cipher is an explicitly constructed service passed to
//! the handlers that need it; the key is either supplied via configuration
//! or generated at startup (in which case cookies do not survive a restart).

use crate::error::GateError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Nonce length for AES-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher for cookie payloads.
pub struct CookieCipher {
    cipher: Aes256Gcm,
}

impl CookieCipher {
    /// Creates a cipher with a key generated at startup.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Creates a cipher from a configured 32-byte key.
    #[must_use]
    pub fn from_key(key_bytes: &[u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypts a message; output is base64url `nonce || ciphertext`.
    pub fn encrypt(&self, message: &str) -> Result<String, GateError> {
        let nonce = Aes256Gcm::generate_nonce(OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, message.as_bytes())
            .map_err(|_| GateError::Internal(anyhow::anyhow!("cookie encryption failed")))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(nonce.as_slice());
        payload.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    /// Decrypts a previously encrypted payload.
    pub fn decrypt(&self, encoded: &str) -> Result<String, GateError> {
        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| GateError::Internal(anyhow::anyhow!("cookie payload not base64")))?;
        if payload.len() <= NONCE_LEN {
            return Err(GateError::Internal(anyhow::anyhow!(
                "cookie payload too short"
            )));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| GateError::Internal(anyhow::anyhow!("cookie decryption failed")))?;

        String::from_utf8(plaintext)
            .map_err(|_| GateError::Internal(anyhow::anyhow!("cookie payload not UTF-8")))
    }
}
