//! X25519 key agreement primitives.
//!
//! Thin wrappers around `x25519-dalek` with automatic zeroization of secret
//! material on drop.

use std::fmt;

use x25519_dalek::{
    EphemeralSecret as DalekEphemeral, PublicKey as DalekPublic, StaticSecret as DalekStatic,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{PUBLIC_KEY_SIZE, SHARED_SECRET_SIZE};

/// The server's long-term X25519 secret key.
///
/// Read-only after startup and shared by every handshake attempt. The inner
/// dalek key zeroizes itself when dropped.
#[derive(Clone)]
pub struct StaticSecret(DalekStatic);

impl StaticSecret {
    /// Generate a new random static secret.
    pub fn random() -> Self {
        Self(DalekStatic::random_from_rng(rand::thread_rng()))
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(DalekStatic::from(bytes))
    }

    /// Export the secret key bytes.
    ///
    /// # Security
    ///
    /// Handle the returned bytes with care and zeroize when done.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Agree on a shared secret with a client's ephemeral key.
    ///
    /// Returns `None` when the ephemeral key lies in the small-order subgroup:
    /// the resulting secret would be independent of our key and is useless
    /// for authentication.
    pub fn agree(&self, ephemeral: &PublicKey) -> Option<SharedSecret> {
        let shared = self.0.diffie_hellman(&ephemeral.0);
        if !shared.was_contributory() {
            return None;
        }
        Some(SharedSecret(*shared.as_bytes()))
    }
}

impl fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticSecret(..)")
    }
}

impl From<&StaticSecret> for PublicKey {
    fn from(secret: &StaticSecret) -> Self {
        PublicKey(DalekPublic::from(&secret.0))
    }
}

/// A single-use X25519 secret, as generated by the client side.
pub struct EphemeralSecret(DalekEphemeral);

impl EphemeralSecret {
    /// Generate a new random ephemeral secret.
    pub fn random() -> Self {
        Self(DalekEphemeral::random_from_rng(rand::thread_rng()))
    }

    /// Perform X25519 Diffie-Hellman key agreement.
    pub fn diffie_hellman(self, their_public: &PublicKey) -> SharedSecret {
        SharedSecret(*self.0.diffie_hellman(&their_public.0).as_bytes())
    }
}

impl From<&EphemeralSecret> for PublicKey {
    fn from(secret: &EphemeralSecret) -> Self {
        PublicKey(DalekPublic::from(&secret.0))
    }
}

/// An X25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(DalekPublic);

impl PublicKey {
    /// Create from raw bytes. Every 32-byte string is a valid encoding.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(DalekPublic::from(bytes))
    }

    /// Get the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Convert to raw bytes.
    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }
}

/// The output of an X25519 key agreement.
///
/// Used directly as the AES-256-GCM key for the covert payloads in both
/// directions. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl SharedSecret {
    /// Wrap raw shared secret bytes.
    pub fn from_bytes(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw shared secret bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}
