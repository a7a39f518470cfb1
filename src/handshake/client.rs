//! Client side of the disguised handshake.
//!
//! Used to drive the server in tests and benchmarks, and by anyone writing a
//! compatible client.

use bytes::{BufMut, BytesMut};

use crate::crypto::{Aead, EphemeralSecret, PublicKey, SessionKey, SharedSecret, NONCE_SIZE};
use crate::error::{Error, Result};
use crate::handshake::auth::nonce_from_random;
use crate::handshake::server_hello::{
    ENCRYPTED_KEY_LEN, KEY_EXCHANGE_OFFSET, RANDOM_CIPHERTEXT_LEN, REPLY_LEN, SERVER_HELLO_LEN,
    SERVER_RANDOM_OFFSET,
};
use crate::handshake::{
    ContentType, ExtensionType, HandshakeType, AUTH_PLAINTEXT_SIZE, CIPHERTEXT_WITH_TAG_SIZE,
    CLIENT_HELLO_MAGIC, RANDOM_SIZE, RECORD_HEADER_LEN, SESSION_ID_SIZE, TLS12_VERSION,
    X25519_GROUP,
};

/// Builder for ClientHello messages in the disguise profile.
#[derive(Clone, Debug)]
pub struct ClientHelloBuilder {
    /// Server name indication (SNI)
    sni: String,
    /// ALPN protocols to advertise
    alpn: Vec<String>,
    key_share: bool,
}

impl ClientHelloBuilder {
    /// Create a builder advertising `sni`.
    pub fn new(sni: impl Into<String>) -> Self {
        Self {
            sni: sni.into(),
            alpn: Vec::new(),
            key_share: true,
        }
    }

    /// Advertise ALPN protocols (e.g. `["h2", "http/1.1"]`).
    pub fn alpn(mut self, alpn: Vec<String>) -> Self {
        self.alpn = alpn;
        self
    }

    /// Leave out the key_share extension.
    pub fn without_key_share(mut self) -> Self {
        self.key_share = false;
        self
    }

    /// Build a record-wrapped ClientHello from raw field values.
    ///
    /// `key_share` becomes the x25519 entry verbatim, whatever its length.
    pub fn build(
        &self,
        random: &[u8; RANDOM_SIZE],
        session_id: &[u8],
        key_share: &[u8],
    ) -> Vec<u8> {
        let body = self.build_client_hello_body(random, session_id, key_share);

        let mut buf = BytesMut::with_capacity(RECORD_HEADER_LEN + body.len());
        buf.put_slice(&CLIENT_HELLO_MAGIC);
        buf.put_u16(body.len() as u16);
        buf.put_slice(&body);
        buf.to_vec()
    }

    /// Build a disguised ClientHello carrying `plaintext` for the server
    /// owning `server_public`.
    ///
    /// Returns the hello and the secret shared with the server, which is
    /// needed to [`open_reply`].
    pub fn seal(
        &self,
        server_public: &PublicKey,
        plaintext: &[u8; AUTH_PLAINTEXT_SIZE],
    ) -> Result<(Vec<u8>, SharedSecret)> {
        let ephemeral = EphemeralSecret::random();
        let random = PublicKey::from(&ephemeral).to_bytes();
        let shared = ephemeral.diffie_hellman(server_public);

        let ciphertext =
            Aead::new(shared.as_bytes()).encrypt(&nonce_from_random(&random), plaintext)?;
        if ciphertext.len() != CIPHERTEXT_WITH_TAG_SIZE {
            return Err(Error::crypto("unexpected covert ciphertext length"));
        }
        let (session_id, key_share) = ciphertext.split_at(SESSION_ID_SIZE);

        Ok((self.build(&random, session_id, key_share), shared))
    }

    fn build_client_hello_body(
        &self,
        random: &[u8; RANDOM_SIZE],
        session_id: &[u8],
        key_share: &[u8],
    ) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(400);

        buf.put_u8(HandshakeType::ClientHello as u8);
        let length_pos = buf.len();
        buf.put_slice(&[0, 0, 0]);

        buf.put_u16(TLS12_VERSION);
        buf.put_slice(random);

        buf.put_u8(session_id.len() as u8);
        buf.put_slice(session_id);

        let cipher_suites = Self::cipher_suites();
        buf.put_u16(cipher_suites.len() as u16);
        buf.put_slice(&cipher_suites);

        // Compression methods (null only)
        buf.put_u8(1);
        buf.put_u8(0);

        let extensions = self.build_extensions(key_share);
        buf.put_u16(extensions.len() as u16);
        buf.put_slice(&extensions);

        let total_len = (buf.len() - 4) as u32;
        buf[length_pos..length_pos + 3].copy_from_slice(&total_len.to_be_bytes()[1..]);

        buf.to_vec()
    }

    fn cipher_suites() -> [u8; 18] {
        [
            0x13, 0x01, // TLS_AES_128_GCM_SHA256
            0x13, 0x02, // TLS_AES_256_GCM_SHA384
            0x13, 0x03, // TLS_CHACHA20_POLY1305_SHA256
            0xc0, 0x2b, // TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
            0xc0, 0x2f, // TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
            0xc0, 0x2c, // TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
            0xc0, 0x30, // TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
            0xcc, 0xa9, // TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256
            0xcc, 0xa8, // TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256
        ]
    }

    fn build_extensions(&self, key_share: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(256);

        self.write_sni_extension(&mut buf);
        write_supported_groups(&mut buf);
        write_signature_algorithms(&mut buf);
        if !self.alpn.is_empty() {
            self.write_alpn_extension(&mut buf);
        }
        write_supported_versions(&mut buf);
        if self.key_share {
            write_key_share(&mut buf, key_share);
        }

        buf.to_vec()
    }

    fn write_sni_extension(&self, buf: &mut BytesMut) {
        let sni_bytes = self.sni.as_bytes();
        let list_len = 3 + sni_bytes.len(); // type(1) + len(2) + name

        buf.put_u16(ExtensionType::ServerName as u16);
        buf.put_u16((2 + list_len) as u16);
        buf.put_u16(list_len as u16);
        buf.put_u8(0); // host_name
        buf.put_u16(sni_bytes.len() as u16);
        buf.put_slice(sni_bytes);
    }

    fn write_alpn_extension(&self, buf: &mut BytesMut) {
        let mut alpn_list = Vec::new();
        for proto in &self.alpn {
            alpn_list.push(proto.len() as u8);
            alpn_list.extend_from_slice(proto.as_bytes());
        }

        buf.put_u16(ExtensionType::Alpn as u16);
        buf.put_u16((2 + alpn_list.len()) as u16);
        buf.put_u16(alpn_list.len() as u16);
        buf.put_slice(&alpn_list);
    }
}

fn write_supported_groups(buf: &mut BytesMut) {
    let groups = [
        0x00, 0x1d, // x25519
        0x00, 0x17, // secp256r1
        0x00, 0x18, // secp384r1
    ];

    buf.put_u16(ExtensionType::SupportedGroups as u16);
    buf.put_u16((2 + groups.len()) as u16);
    buf.put_u16(groups.len() as u16);
    buf.put_slice(&groups);
}

fn write_signature_algorithms(buf: &mut BytesMut) {
    let algorithms = [
        0x04, 0x03, // ecdsa_secp256r1_sha256
        0x08, 0x04, // rsa_pss_rsae_sha256
        0x04, 0x01, // rsa_pkcs1_sha256
        0x05, 0x03, // ecdsa_secp384r1_sha384
        0x08, 0x05, // rsa_pss_rsae_sha384
        0x05, 0x01, // rsa_pkcs1_sha384
    ];

    buf.put_u16(ExtensionType::SignatureAlgorithms as u16);
    buf.put_u16((2 + algorithms.len()) as u16);
    buf.put_u16(algorithms.len() as u16);
    buf.put_slice(&algorithms);
}

fn write_supported_versions(buf: &mut BytesMut) {
    buf.put_u16(ExtensionType::SupportedVersions as u16);
    buf.put_u16(3);
    buf.put_u8(2);
    buf.put_u16(0x0304); // TLS 1.3
}

fn write_key_share(buf: &mut BytesMut, key_exchange: &[u8]) {
    let entry_len = 2 + 2 + key_exchange.len(); // group(2) + len(2) + key

    buf.put_u16(ExtensionType::KeyShare as u16);
    buf.put_u16((2 + entry_len) as u16);
    buf.put_u16(entry_len as u16);
    buf.put_u16(X25519_GROUP);
    buf.put_u16(key_exchange.len() as u16);
    buf.put_slice(key_exchange);
}

/// Recover the session key from a server reply.
///
/// # Errors
///
/// [`Error::MalformedMessage`] if the reply does not have the expected
/// shape, [`Error::Crypto`] if the sealed key does not open under `shared`.
pub fn open_reply(reply: &[u8], shared: &SharedSecret) -> Result<SessionKey> {
    if reply.len() != REPLY_LEN
        || reply[0] != ContentType::Handshake as u8
        || reply[3..5] != (SERVER_HELLO_LEN as u16).to_be_bytes()
        || reply[RECORD_HEADER_LEN] != HandshakeType::ServerHello as u8
    {
        return Err(Error::MalformedMessage);
    }
    let server_hello = &reply[RECORD_HEADER_LEN..RECORD_HEADER_LEN + SERVER_HELLO_LEN];

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&server_hello[SERVER_RANDOM_OFFSET..SERVER_RANDOM_OFFSET + NONCE_SIZE]);

    let random_part = SERVER_RANDOM_OFFSET + NONCE_SIZE;
    let mut sealed = Vec::with_capacity(ENCRYPTED_KEY_LEN);
    sealed.extend_from_slice(&server_hello[random_part..random_part + RANDOM_CIPHERTEXT_LEN]);
    sealed.extend_from_slice(
        &server_hello
            [KEY_EXCHANGE_OFFSET..KEY_EXCHANGE_OFFSET + ENCRYPTED_KEY_LEN - RANDOM_CIPHERTEXT_LEN],
    );

    let opened = Aead::new(shared.as_bytes()).decrypt(&nonce, &sealed)?;
    opened
        .as_slice()
        .try_into()
        .map_err(|_| Error::crypto("session key has the wrong length"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::StaticSecret;
    use crate::handshake::{compose_reply, parse_client_hello, ExtensionType};

    #[test]
    fn test_build_layout() {
        let data = ClientHelloBuilder::new("www.example.com")
            .alpn(vec!["h2".to_string(), "http/1.1".to_string()])
            .build(&[0x42; 32], &[0x11; 32], &[0x22; 32]);

        assert_eq!(&data[..3], &CLIENT_HELLO_MAGIC);
        assert_eq!(
            u16::from_be_bytes([data[3], data[4]]) as usize,
            data.len() - RECORD_HEADER_LEN
        );
        assert_eq!(data[5], 0x01);

        let ch = parse_client_hello(&data).unwrap();
        let alpn = ch.extension(ExtensionType::Alpn).unwrap();
        assert_eq!(&alpn[2..5], &[0x02, b'h', b'2']);
    }

    #[test]
    fn test_seal_is_openable_by_server() {
        let server = StaticSecret::random();
        let plaintext = [0x61; AUTH_PLAINTEXT_SIZE];
        let (data, client_shared) = ClientHelloBuilder::new("www.example.com")
            .seal(&PublicKey::from(&server), &plaintext)
            .unwrap();

        let ch = parse_client_hello(&data).unwrap();
        let server_shared = server
            .agree(&PublicKey::from_bytes(*ch.random()))
            .unwrap();
        assert_eq!(server_shared.as_bytes(), client_shared.as_bytes());

        let mut ciphertext = ch.session_id().to_vec();
        ciphertext.extend_from_slice(&ch.key_share().unwrap());
        let opened = Aead::new(server_shared.as_bytes())
            .decrypt(&nonce_from_random(ch.random()), &ciphertext)
            .unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_open_reply() {
        let shared = SharedSecret::from_bytes([0x44; 32]);
        let reply = compose_reply(&[0; SESSION_ID_SIZE], &shared, &[0x99; 32]).unwrap();
        assert_eq!(open_reply(&reply, &shared).unwrap(), [0x99; 32]);

        let wrong = SharedSecret::from_bytes([0x45; 32]);
        assert!(matches!(open_reply(&reply, &wrong), Err(Error::Crypto(_))));
        assert!(matches!(
            open_reply(&reply[..100], &shared),
            Err(Error::MalformedMessage)
        ));
    }
}
