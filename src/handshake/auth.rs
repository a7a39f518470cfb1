//! Covert authentication payload and the collaborators that judge it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;
use std::time::SystemTime;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{PublicKey, SharedSecret, StaticSecret, NONCE_SIZE};
use crate::error::{Error, Result};
use crate::handshake::{
    ClientHello, ParseError, CIPHERTEXT_WITH_TAG_SIZE, KEY_SHARE_SIZE, RANDOM_SIZE,
};

/// Everything the authenticator needs to open a disguised ClientHello.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AuthenticationPayload {
    nonce: [u8; NONCE_SIZE],
    shared_secret: SharedSecret,
    ciphertext_with_tag: [u8; CIPHERTEXT_WITH_TAG_SIZE],
}

impl AuthenticationPayload {
    /// Assemble the payload from a parsed ClientHello.
    ///
    /// The ciphertext is `session_id || key_share` and must be exactly 64
    /// bytes long; anything else is rejected before it can reach an
    /// authenticator.
    pub fn from_client_hello(
        client_hello: &ClientHello,
        shared_secret: SharedSecret,
    ) -> std::result::Result<Self, ParseError> {
        let key_share = client_hello.key_share()?;
        let session_id = client_hello.session_id();

        let len = session_id.len() + KEY_SHARE_SIZE;
        if len != CIPHERTEXT_WITH_TAG_SIZE {
            return Err(ParseError::CiphertextLength(len));
        }

        let mut ciphertext_with_tag = [0u8; CIPHERTEXT_WITH_TAG_SIZE];
        let (head, tail) = ciphertext_with_tag.split_at_mut(session_id.len());
        head.copy_from_slice(session_id);
        tail.copy_from_slice(&key_share);

        Ok(Self {
            nonce: nonce_from_random(client_hello.random()),
            shared_secret,
            ciphertext_with_tag,
        })
    }

    /// First 12 bytes of the ClientHello random.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// X25519 secret shared with the client.
    pub fn shared_secret(&self) -> &SharedSecret {
        &self.shared_secret
    }

    /// Session id followed by the key-share value.
    pub fn ciphertext_with_tag(&self) -> &[u8; CIPHERTEXT_WITH_TAG_SIZE] {
        &self.ciphertext_with_tag
    }
}

/// The AEAD nonce embedded at the front of a hello random.
pub(crate) fn nonce_from_random(random: &[u8; RANDOM_SIZE]) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&random[..NONCE_SIZE]);
    nonce
}

/// Treat the ClientHello random as an X25519 public key and agree on a
/// shared secret with the server's static key.
///
/// # Errors
///
/// [`Error::InvalidPublicKey`] if the random is a small-order point. That
/// is usually a genuine TLS client whose random happens to be unusable,
/// not a malformed message.
pub fn derive_shared_secret(
    random: &[u8; RANDOM_SIZE],
    static_secret: &StaticSecret,
) -> Result<SharedSecret> {
    static_secret
        .agree(&PublicKey::from_bytes(*random))
        .ok_or(Error::InvalidPublicKey)
}

/// Verdict of a successful authentication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientInfo {
    /// User identifier
    pub uid: Vec<u8>,
    /// Client-chosen session number
    pub session_id: u32,
    /// Proxy method the client wants to reach
    pub proxy_method: String,
    /// Payload encryption the client will use after the handshake
    pub encryption_method: u8,
    /// Whether the session runs over an unordered transport
    pub unordered: bool,
}

/// Decides whether an authentication payload came from a legitimate client.
///
/// Implementations typically open the ciphertext with the shared secret and
/// nonce, check a timestamp against `now`, and look the user up.
pub trait Authenticator: Send + Sync {
    /// Identify the client or reject it.
    fn authenticate(&self, payload: &AuthenticationPayload, now: SystemTime)
        -> Result<ClientInfo>;
}

impl<F> Authenticator for F
where
    F: Fn(&AuthenticationPayload, SystemTime) -> Result<ClientInfo> + Send + Sync,
{
    fn authenticate(
        &self,
        payload: &AuthenticationPayload,
        now: SystemTime,
    ) -> Result<ClientInfo> {
        self(payload, now)
    }
}

/// The set of proxy methods this server is willing to serve.
pub trait ProxyRegistry: Send + Sync {
    /// Check whether `method` is enabled.
    fn contains(&self, method: &str) -> bool;
}

impl<V, S> ProxyRegistry for HashMap<String, V, S>
where
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn contains(&self, method: &str) -> bool {
        self.contains_key(method)
    }
}

impl<S> ProxyRegistry for HashSet<String, S>
where
    S: BuildHasher + Send + Sync,
{
    fn contains(&self, method: &str) -> bool {
        HashSet::contains(self, method)
    }
}

impl ProxyRegistry for BTreeSet<String> {
    fn contains(&self, method: &str) -> bool {
        BTreeSet::contains(self, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::{parse_client_hello, ClientHelloBuilder};

    fn hello(session_id: &[u8], key_share: &[u8]) -> ClientHello {
        let data =
            ClientHelloBuilder::new("www.example.com").build(&[0x42; 32], session_id, key_share);
        parse_client_hello(&data).unwrap()
    }

    #[test]
    fn test_payload_concatenates_session_id_and_key_share() {
        let ch = hello(&[0x11; 32], &[0x22; 32]);
        let payload =
            AuthenticationPayload::from_client_hello(&ch, SharedSecret::from_bytes([9; 32]))
                .unwrap();

        assert_eq!(payload.nonce(), &[0x42; 12]);
        assert_eq!(&payload.ciphertext_with_tag()[..32], &[0x11; 32]);
        assert_eq!(&payload.ciphertext_with_tag()[32..], &[0x22; 32]);
        assert_eq!(payload.shared_secret().as_bytes(), &[9; 32]);
    }

    #[test]
    fn test_payload_rejects_wrong_ciphertext_length() {
        for sid_len in [0usize, 31, 33] {
            let ch = hello(&vec![0x11; sid_len], &[0x22; 32]);
            let err =
                AuthenticationPayload::from_client_hello(&ch, SharedSecret::from_bytes([9; 32]))
                    .err()
                    .unwrap();
            assert_eq!(err, ParseError::CiphertextLength(sid_len + 32));
        }
    }

    #[test]
    fn test_payload_rejects_short_key_share() {
        let ch = hello(&[0x11; 32], &[0x22; 31]);
        let err = AuthenticationPayload::from_client_hello(&ch, SharedSecret::from_bytes([9; 32]))
            .err()
            .unwrap();
        assert_eq!(err, ParseError::KeyShareLength(31));
    }

    #[test]
    fn test_derive_shared_secret_rejects_small_order() {
        let secret = StaticSecret::random();
        assert!(matches!(
            derive_shared_secret(&[0u8; 32], &secret),
            Err(Error::InvalidPublicKey)
        ));
    }

    #[test]
    fn test_registries() {
        let mut book = HashMap::new();
        book.insert("shadowsocks".to_string(), "127.0.0.1:8388".to_string());
        assert!(ProxyRegistry::contains(&book, "shadowsocks"));
        assert!(!ProxyRegistry::contains(&book, "openvpn"));

        let set: HashSet<String> = ["openvpn".to_string()].into_iter().collect();
        assert!(ProxyRegistry::contains(&set, "openvpn"));

        let tree: BTreeSet<String> = BTreeSet::new();
        assert!(!ProxyRegistry::contains(&tree, "openvpn"));
    }

    #[test]
    fn test_closure_authenticator() {
        let auth = |_: &AuthenticationPayload, _: SystemTime| -> Result<ClientInfo> {
            Err(Error::authentication("unknown user"))
        };
        let ch = hello(&[0x11; 32], &[0x22; 32]);
        let payload =
            AuthenticationPayload::from_client_hello(&ch, SharedSecret::from_bytes([9; 32]))
                .unwrap();
        assert!(auth.authenticate(&payload, SystemTime::now()).is_err());
    }
}
