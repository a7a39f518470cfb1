//! Camouflaged TLS 1.3 handshake.
//!
//! The first flight of a covert session is shaped exactly like a TLS 1.3
//! ClientHello/ServerHello exchange. The authentication payload rides in
//! fields that carry high-entropy data in genuine TLS anyway.
//!
//! ## ClientHello layout
//!
//! ```text
//! random      = client ephemeral X25519 public key (32)
//!               first 12 bytes double as the AEAD nonce
//! session_id  = ciphertext[0..32]
//! key_share   = x25519 entry holding ciphertext[32..64]
//! ```
//!
//! ## Reply layout
//!
//! ```text
//! ServerHello.random         = nonce (12) || enc_key[0..20]
//! ServerHello.session_id     = echoed client session_id
//! ServerHello.key_share      = enc_key[20..48] || 4 random bytes
//! ChangeCipherSpec           = 0x01
//! ApplicationData            = 68 random bytes (fake certificate)
//! ```
//!
//! ## Acceptance pipeline
//!
//! ```text
//! bytes ─► parse ─► replay check ─► X25519 ─► authenticate ─► proxy method
//!                                                                  │
//!                                   transport ◄─ finish(key) ◄─ PendingReply
//! ```

mod auth;
pub mod client;
mod client_hello;
mod config;
mod reader;
mod replay;
mod server;
mod server_hello;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{
    derive_shared_secret, AuthenticationPayload, Authenticator, ClientInfo, ProxyRegistry,
};
pub use client::{open_reply, ClientHelloBuilder};
pub use client_hello::{
    parse_client_hello, parse_extensions, parse_key_share, ClientHello, ParseError,
};
pub use config::{ServerConfig, ServerConfigFile};
pub use replay::{ReplayGuard, DEFAULT_REPLAY_CAPACITY, DEFAULT_REPLAY_WINDOW};
pub use server::{PendingReply, ServerState};
pub use server_hello::{compose_reply, compose_server_hello, put_record};

/// TLS record content types
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    /// change_cipher_spec
    ChangeCipherSpec = 20,
    /// handshake
    Handshake = 22,
    /// application_data
    ApplicationData = 23,
}

/// TLS handshake message types
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeType {
    /// client_hello
    ClientHello = 1,
    /// server_hello
    ServerHello = 2,
}

/// TLS extension types used by the disguise profile
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionType {
    /// server_name
    ServerName = 0x0000,
    /// supported_groups
    SupportedGroups = 0x000a,
    /// signature_algorithms
    SignatureAlgorithms = 0x000d,
    /// application_layer_protocol_negotiation
    Alpn = 0x0010,
    /// supported_versions
    SupportedVersions = 0x002b,
    /// key_share
    KeyShare = 0x0033,
}

/// Record-layer prefix of every disguised ClientHello: handshake, TLS 1.0
pub const CLIENT_HELLO_MAGIC: [u8; 3] = [0x16, 0x03, 0x01];

/// Length of a TLS record header
pub const RECORD_HEADER_LEN: usize = 5;

/// Legacy version carried by the reply records and the ServerHello
pub const TLS12_VERSION: u16 = 0x0303;

/// Named group id of x25519
pub const X25519_GROUP: u16 = 0x001d;

/// Length of the ClientHello random field
pub const RANDOM_SIZE: usize = 32;

/// Length of the session id every disguise client sends
pub const SESSION_ID_SIZE: usize = 32;

/// Length of an x25519 key-share value
pub const KEY_SHARE_SIZE: usize = 32;

/// Length of the covert ciphertext: session id followed by the key share
pub const CIPHERTEXT_WITH_TAG_SIZE: usize = SESSION_ID_SIZE + KEY_SHARE_SIZE;

/// Plaintext length of the client's covert payload
pub const AUTH_PLAINTEXT_SIZE: usize = CIPHERTEXT_WITH_TAG_SIZE - crate::crypto::TAG_SIZE;
