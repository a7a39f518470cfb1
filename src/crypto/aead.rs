//! Authenticated Encryption with Associated Data (AEAD).
//!
//! The covert payloads travel under AES-256-GCM keyed directly by the X25519
//! shared secret. Each message uses a fresh random 96-bit nonce that is
//! carried in the clear inside the disguised `random` field.

use aes_gcm::{
    aead::{Aead as AeadTrait, KeyInit},
    Aes256Gcm, Nonce,
};

use crate::crypto::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// AES-256-GCM cipher.
pub struct Aead {
    cipher: Aes256Gcm,
}

impl Aead {
    /// Create a new AEAD instance with the given key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Encrypt plaintext, returning ciphertext || tag (16 bytes appended).
    pub fn encrypt(&self, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| Error::crypto("encryption failed"))
    }

    /// Decrypt ciphertext || tag.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails (wrong key, tampered data, etc.)
    pub fn decrypt(&self, nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::crypto(format!(
                "ciphertext shorter than tag: {} bytes",
                ciphertext.len()
            )));
        }

        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::crypto("decryption/authentication failed"))
    }
}
