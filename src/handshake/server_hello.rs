//! Camouflage reply composition.
//!
//! The reply is a ServerHello, a ChangeCipherSpec and one application-data
//! record shaped like an encrypted certificate. Every byte is fixed except
//! the AEAD nonce, the encrypted session key, the echoed session id and the
//! random filler, so the flight has the same length and shape every time.

use bytes::{BufMut, BytesMut};

use crate::crypto::{random_padding, Aead, SecureRandom, SessionKey, SharedSecret, NONCE_SIZE};
use crate::error::{Error, Result};
use crate::handshake::{
    ContentType, HandshakeType, RECORD_HEADER_LEN, SESSION_ID_SIZE, TLS12_VERSION,
};

/// Length of the ServerHello handshake message, header included
pub const SERVER_HELLO_LEN: usize = 122;

/// Length of the ServerHello body as written in its handshake header
pub const SERVER_HELLO_BODY_LEN: usize = SERVER_HELLO_LEN - 4;

/// Encrypted session key plus tag
pub const ENCRYPTED_KEY_LEN: usize = 48;

/// How many encrypted-key bytes follow the nonce in the ServerHello random
pub const RANDOM_CIPHERTEXT_LEN: usize = 20;

/// Offset of the ServerHello random inside the handshake message
pub const SERVER_RANDOM_OFFSET: usize = 6;

/// Offset of the key_share key-exchange field inside the handshake message
pub const KEY_EXCHANGE_OFFSET: usize = 84;

/// Random bytes closing out the key_share key-exchange field
pub const KEY_EXCHANGE_PADDING: usize = 4;

/// Length of the fake encrypted certificate
pub const FAKE_CERTIFICATE_LEN: usize = 68;

/// Total length of the reply flight
pub const REPLY_LEN: usize =
    RECORD_HEADER_LEN * 3 + SERVER_HELLO_LEN + 1 + FAKE_CERTIFICATE_LEN;

/// TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
const CIPHER_SUITE: u16 = 0xc030;

/// Total length of the two ServerHello extensions
const EXTENSIONS_LEN: u16 = 46;

/// key_share type, extension length 36, x25519, key length 32
const KEY_SHARE_HEADER: [u8; 8] = [0x00, 0x33, 0x00, 0x24, 0x00, 0x1d, 0x00, 0x20];

/// supported_versions: TLS 1.3
const SUPPORTED_VERSIONS: [u8; 6] = [0x00, 0x2b, 0x00, 0x02, 0x03, 0x04];

/// Append a TLS record (`type | 0x0303 | length | payload`) to `buf`.
pub fn put_record(buf: &mut BytesMut, content_type: ContentType, payload: &[u8]) {
    debug_assert!(payload.len() <= u16::MAX as usize);

    buf.reserve(RECORD_HEADER_LEN + payload.len());
    buf.put_u8(content_type as u8);
    buf.put_u16(TLS12_VERSION);
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
}

/// Build the ServerHello handshake message carrying `session_key`.
///
/// The session key is sealed under the shared secret with a fresh nonce and
/// the 48-byte result is split 20/28 between the random and key_share
/// fields. Neither field alone is enough to recover the key.
pub fn compose_server_hello(
    session_id: &[u8; SESSION_ID_SIZE],
    shared_secret: &SharedSecret,
    session_key: &SessionKey,
) -> Result<BytesMut> {
    let nonce: [u8; NONCE_SIZE] = SecureRandom::bytes();
    let encrypted_key = Aead::new(shared_secret.as_bytes()).encrypt(&nonce, session_key)?;
    if encrypted_key.len() != ENCRYPTED_KEY_LEN {
        return Err(Error::crypto(format!(
            "encrypted session key is {} bytes",
            encrypted_key.len()
        )));
    }
    let (in_random, in_key_share) = encrypted_key.split_at(RANDOM_CIPHERTEXT_LEN);

    let mut buf = BytesMut::with_capacity(SERVER_HELLO_LEN);

    buf.put_u8(HandshakeType::ServerHello as u8);
    buf.put_slice(&(SERVER_HELLO_BODY_LEN as u32).to_be_bytes()[1..]);
    buf.put_u16(TLS12_VERSION);

    // Random: nonce || first part of the sealed key
    buf.put_slice(&nonce);
    buf.put_slice(in_random);

    buf.put_u8(SESSION_ID_SIZE as u8);
    buf.put_slice(session_id);

    buf.put_u16(CIPHER_SUITE);
    buf.put_u8(0); // null compression

    buf.put_u16(EXTENSIONS_LEN);

    // key_share: rest of the sealed key, padded out to a full x25519 value
    buf.put_slice(&KEY_SHARE_HEADER);
    buf.put_slice(in_key_share);
    buf.put_slice(&SecureRandom::bytes::<KEY_EXCHANGE_PADDING>());

    buf.put_slice(&SUPPORTED_VERSIONS);

    debug_assert_eq!(buf.len(), SERVER_HELLO_LEN);
    Ok(buf)
}

/// Build the full reply flight: ServerHello, ChangeCipherSpec and a fake
/// encrypted certificate, each in its own record.
pub fn compose_reply(
    session_id: &[u8; SESSION_ID_SIZE],
    shared_secret: &SharedSecret,
    session_key: &SessionKey,
) -> Result<Vec<u8>> {
    let server_hello = compose_server_hello(session_id, shared_secret, session_key)?;

    let mut reply = BytesMut::with_capacity(REPLY_LEN);
    put_record(&mut reply, ContentType::Handshake, &server_hello);
    put_record(&mut reply, ContentType::ChangeCipherSpec, &[0x01]);
    put_record(
        &mut reply,
        ContentType::ApplicationData,
        &random_padding(FAKE_CERTIFICATE_LEN),
    );

    debug_assert_eq!(reply.len(), REPLY_LEN);
    Ok(reply.to_vec())
}
