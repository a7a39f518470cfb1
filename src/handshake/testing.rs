//! Shared fixtures for handshake tests.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::crypto::{Aead, PublicKey, SharedSecret, StaticSecret};
use crate::error::{Error, Result};
use crate::handshake::{
    AuthenticationPayload, ClientHelloBuilder, ClientInfo, ServerState, AUTH_PLAINTEXT_SIZE,
    RANDOM_SIZE,
};

const UID_LEN: usize = 16;
const METHOD_LEN: usize = 12;
const CLOCK_TOLERANCE: Duration = Duration::from_secs(3600);

/// Covert plaintext: uid(16) | method(12) | encryption(1) | timestamp(8) |
/// session id(4) | unordered(1) | zero padding.
pub(crate) fn plaintext(proxy_method: &str, at: SystemTime) -> [u8; AUTH_PLAINTEXT_SIZE] {
    let mut out = [0u8; AUTH_PLAINTEXT_SIZE];
    out[..UID_LEN].copy_from_slice(&[0xaa; UID_LEN]);
    out[16..16 + proxy_method.len()].copy_from_slice(proxy_method.as_bytes());
    out[28] = 3;
    let secs = at.duration_since(UNIX_EPOCH).unwrap().as_secs();
    out[29..37].copy_from_slice(&secs.to_be_bytes());
    out[37..41].copy_from_slice(&0x0102_0304u32.to_be_bytes());
    out[41] = 1;
    out
}

/// Authenticator understanding [`plaintext`].
pub(crate) fn touchstone(payload: &AuthenticationPayload, now: SystemTime) -> Result<ClientInfo> {
    let opened = Aead::new(payload.shared_secret().as_bytes())
        .decrypt(payload.nonce(), payload.ciphertext_with_tag())
        .map_err(|_| Error::authentication("payload does not open"))?;

    let secs = u64::from_be_bytes(opened[29..37].try_into().unwrap());
    let sent = UNIX_EPOCH + Duration::from_secs(secs);
    let skew = now
        .duration_since(sent)
        .unwrap_or_else(|e| e.duration());
    if skew > CLOCK_TOLERANCE {
        return Err(Error::authentication("timestamp out of range"));
    }

    let method = &opened[UID_LEN..UID_LEN + METHOD_LEN];
    let method_end = method.iter().position(|&b| b == 0).unwrap_or(METHOD_LEN);

    Ok(ClientInfo {
        uid: opened[..UID_LEN].to_vec(),
        session_id: u32::from_be_bytes(opened[37..41].try_into().unwrap()),
        proxy_method: String::from_utf8_lossy(&method[..method_end]).into_owned(),
        encryption_method: opened[28],
        unordered: opened[41] != 0,
    })
}

/// A state with a random key, the given proxy methods and [`touchstone`].
pub(crate) fn test_state(methods: &[&str]) -> (ServerState, PublicKey) {
    let book: HashMap<String, String> = methods
        .iter()
        .map(|m| (m.to_string(), "127.0.0.1:0".to_string()))
        .collect();
    let state = ServerState::new(StaticSecret::random(), book, touchstone);
    let public = state.public_key();
    (state, public)
}

/// A freshly sealed hello and what the client keeps from it.
pub(crate) struct TestClient {
    pub hello: Vec<u8>,
    pub random: [u8; RANDOM_SIZE],
    pub shared: SharedSecret,
}

impl TestClient {
    pub fn new(server_public: &PublicKey, proxy_method: &str) -> Self {
        let (hello, shared) = ClientHelloBuilder::new("www.example.com")
            .seal(server_public, &plaintext(proxy_method, SystemTime::now()))
            .unwrap();
        let random = hello[11..11 + RANDOM_SIZE].try_into().unwrap();
        Self {
            hello,
            random,
            shared,
        }
    }
}

/// A hello with a valid ephemeral key but a covert payload of the given
/// session id and key-share lengths.
pub(crate) fn sealed_hello(server_public: &PublicKey, sid_len: usize, share_len: usize) -> Vec<u8> {
    let (hello, _) = ClientHelloBuilder::new("www.example.com")
        .seal(server_public, &plaintext("x", SystemTime::now()))
        .unwrap();
    let random: [u8; RANDOM_SIZE] = hello[11..11 + RANDOM_SIZE].try_into().unwrap();
    ClientHelloBuilder::new("www.example.com").build(
        &random,
        &vec![0x11; sid_len],
        &vec![0x22; share_len],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touchstone_reads_plaintext() {
        let (state, public) = test_state(&["openvpn"]);
        let client = TestClient::new(&public, "openvpn");
        let (info, _) = state.prepare_connection(&client.hello).unwrap();

        assert_eq!(info.proxy_method, "openvpn");
        assert_eq!(info.encryption_method, 3);
        assert_eq!(info.session_id, 0x0102_0304);
        assert!(info.unordered);
    }

    #[test]
    fn test_touchstone_rejects_stale_timestamp() {
        let (state, public) = test_state(&["openvpn"]);
        let stale = SystemTime::now() - Duration::from_secs(2 * 3600);
        let (hello, _) = ClientHelloBuilder::new("www.example.com")
            .seal(&public, &plaintext("openvpn", stale))
            .unwrap();

        assert!(matches!(
            state.prepare_connection(&hello),
            Err(Error::NotDisguiseClient)
        ));
    }
}
