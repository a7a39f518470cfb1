//! ClientHello decoding.
//!
//! Everything here runs on attacker-controlled bytes before any
//! authentication, so every read is bounds-checked and every failure is a
//! [`ParseError`]. Callers outside this module only ever see the coarse
//! [`Error::MalformedMessage`](crate::Error::MalformedMessage).

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use crate::handshake::reader::Reader;
use crate::handshake::{
    ExtensionType, HandshakeType, CLIENT_HELLO_MAGIC, KEY_SHARE_SIZE, RANDOM_SIZE,
    RECORD_HEADER_LEN, X25519_GROUP,
};

/// Detailed reason a ClientHello (or its covert payload) was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The record does not start with the disguise-profile prefix
    #[error("wrong TLS 1.3 handshake magic bytes")]
    WrongMagic,

    /// Handshake message is not a ClientHello
    #[error("not a ClientHello (handshake type {0:#04x})")]
    NotClientHello(u8),

    /// Declared handshake length disagrees with the bytes received
    #[error("hello length doesn't match: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Length in the handshake header
        declared: usize,
        /// Bytes following the handshake header
        actual: usize,
    },

    /// A field runs past the end of its enclosing buffer
    #[error("truncated {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Field being read
        field: &'static str,
        /// Bytes the field requires
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// Bytes left over after the extensions block
    #[error("{0} trailing bytes after extensions")]
    TrailingData(usize),

    /// No key_share extension present
    #[error("missing key_share extension")]
    MissingKeyShare,

    /// The x25519 key share has the wrong length
    #[error("key share length should be 32, instead of {0}")]
    KeyShareLength(usize),

    /// The key_share extension has no x25519 entry
    #[error("x25519 does not exist")]
    X25519NotOffered,

    /// session_id ++ key_share is not a full ciphertext-with-tag
    #[error("ciphertext length should be 64, instead of {0}")]
    CiphertextLength(usize),
}

/// A parsed ClientHello.
///
/// Immutable once constructed. Variable-length fields are owned [`Bytes`]
/// so the hello can outlive the packet buffer it came from.
#[derive(Clone, Debug)]
pub struct ClientHello {
    handshake_type: u8,
    length: usize,
    client_version: [u8; 2],
    random: [u8; RANDOM_SIZE],
    session_id: Bytes,
    cipher_suites: Bytes,
    compression_methods: Bytes,
    extensions: HashMap<u16, Bytes>,
}

impl ClientHello {
    /// Handshake message type (always 0x01).
    pub fn handshake_type(&self) -> u8 {
        self.handshake_type
    }

    /// Declared length of the handshake body.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Legacy client version.
    pub fn client_version(&self) -> [u8; 2] {
        self.client_version
    }

    /// The 32-byte random, which carries the client's ephemeral key.
    pub fn random(&self) -> &[u8; RANDOM_SIZE] {
        &self.random
    }

    /// Legacy session id.
    pub fn session_id(&self) -> &Bytes {
        &self.session_id
    }

    /// Raw cipher-suite list.
    pub fn cipher_suites(&self) -> &Bytes {
        &self.cipher_suites
    }

    /// Raw compression-method list.
    pub fn compression_methods(&self) -> &Bytes {
        &self.compression_methods
    }

    /// All extensions by type.
    pub fn extensions(&self) -> &HashMap<u16, Bytes> {
        &self.extensions
    }

    /// Payload of a single extension.
    pub fn extension(&self, ext_type: ExtensionType) -> Option<&Bytes> {
        self.extensions.get(&(ext_type as u16))
    }

    /// The x25519 value of the key_share extension.
    pub fn key_share(&self) -> Result<[u8; KEY_SHARE_SIZE], ParseError> {
        let payload = self
            .extension(ExtensionType::KeyShare)
            .ok_or(ParseError::MissingKeyShare)?;
        parse_key_share(payload)
    }
}

/// Parse a record-wrapped ClientHello.
///
/// The record length field is not consulted; the handshake length must
/// match the rest of the buffer exactly, so a partial record fails.
pub fn parse_client_hello(data: &[u8]) -> Result<ClientHello, ParseError> {
    let mut record = Reader::new(data);
    let magic: [u8; 3] = record.read_array("record header")?;
    if magic != CLIENT_HELLO_MAGIC {
        return Err(ParseError::WrongMagic);
    }
    let _record_len = record.read_u16("record header")?;
    debug_assert_eq!(data.len() - record.remaining(), RECORD_HEADER_LEN);

    let handshake_type = record.read_u8("handshake type")?;
    if handshake_type != HandshakeType::ClientHello as u8 {
        return Err(ParseError::NotClientHello(handshake_type));
    }

    let length = record.read_u24("handshake length")? as usize;
    if length != record.remaining() {
        return Err(ParseError::LengthMismatch {
            declared: length,
            actual: record.remaining(),
        });
    }

    let client_version = record.read_array("client version")?;
    let random = record.read_array("random")?;

    let session_id_len = record.read_u8("session id length")? as usize;
    let session_id = record.read_slice("session id", session_id_len)?;

    let cipher_suites_len = record.read_u16("cipher suites length")? as usize;
    let cipher_suites = record.read_slice("cipher suites", cipher_suites_len)?;

    let compression_len = record.read_u8("compression methods length")? as usize;
    let compression_methods = record.read_slice("compression methods", compression_len)?;

    let extensions_len = record.read_u16("extensions length")? as usize;
    let extensions = parse_extensions(record.read_slice("extensions", extensions_len)?)?;

    if !record.is_consumed() {
        return Err(ParseError::TrailingData(record.remaining()));
    }

    Ok(ClientHello {
        handshake_type,
        length,
        client_version,
        random,
        session_id: Bytes::copy_from_slice(session_id),
        cipher_suites: Bytes::copy_from_slice(cipher_suites),
        compression_methods: Bytes::copy_from_slice(compression_methods),
        extensions,
    })
}

/// Split an extensions block into `type -> payload`.
///
/// A repeated extension type replaces the earlier payload.
pub fn parse_extensions(input: &[u8]) -> Result<HashMap<u16, Bytes>, ParseError> {
    let mut r = Reader::new(input);
    let mut extensions = HashMap::new();

    while !r.is_consumed() {
        let ext_type = r.read_u16("extension type")?;
        let ext_len = r.read_u16("extension length")? as usize;
        let data = r.read_slice("extension data", ext_len)?;

        // TODO: decide whether duplicate extensions should reject the hello
        if extensions
            .insert(ext_type, Bytes::copy_from_slice(data))
            .is_some()
        {
            tracing::debug!("duplicate extension {:#06x} in ClientHello", ext_type);
        }
    }

    Ok(extensions)
}

/// Extract the x25519 public value from a key_share extension payload.
pub fn parse_key_share(input: &[u8]) -> Result<[u8; KEY_SHARE_SIZE], ParseError> {
    let mut r = Reader::new(input);
    let shares_len = r.read_u16("client shares length")? as usize;
    let mut shares = Reader::new(r.read_slice("client shares", shares_len)?);

    while !shares.is_consumed() {
        let group = shares.read_u16("key share group")?;
        let len = shares.read_u16("key exchange length")? as usize;

        if group == X25519_GROUP {
            if len != KEY_SHARE_SIZE {
                return Err(ParseError::KeyShareLength(len));
            }
            return shares.read_array("key exchange");
        }

        shares.read_slice("key exchange", len)?;
    }

    Err(ParseError::X25519NotOffered)
}
