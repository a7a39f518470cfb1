//! Cryptographic primitives for the handshake.
//!
//! This module provides:
//! - X25519 key agreement between the client's ephemeral key and the
//!   server's static key
//! - AES-256-GCM for the covert payloads
//! - Secure random number generation
//!
//! All secret material is zeroized on drop to prevent memory leakage.

mod aead;
mod keys;
mod random;

pub use aead::Aead;
pub use keys::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};
pub use random::{random_padding, SecureRandom};

/// Size of symmetric keys in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of AEAD nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of AEAD authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of X25519 public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an X25519 shared secret in bytes
pub const SHARED_SECRET_SIZE: usize = 32;

/// A caller-chosen session key delivered to the client inside the reply.
pub type SessionKey = [u8; KEY_SIZE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_key_exchange_and_encryption() {
        let server_static = StaticSecret::random();
        let server_public = PublicKey::from(&server_static);

        let client_ephemeral = EphemeralSecret::random();
        let client_public = PublicKey::from(&client_ephemeral);

        let client_shared = client_ephemeral.diffie_hellman(&server_public);
        let server_shared = server_static.agree(&client_public).unwrap();

        let session_key: SessionKey = SecureRandom::bytes();
        let nonce: [u8; NONCE_SIZE] = SecureRandom::bytes();

        let ciphertext = Aead::new(server_shared.as_bytes())
            .encrypt(&nonce, &session_key)
            .unwrap();
        let decrypted = Aead::new(client_shared.as_bytes())
            .decrypt(&nonce, &ciphertext)
            .unwrap();

        assert_eq!(decrypted, session_key);
    }
}
