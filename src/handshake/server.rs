//! Handshake orchestration.
//!
//! [`ServerState::prepare_connection`] decides whether a first packet comes
//! from a legitimate disguise client. Nothing is written to the wire until
//! the caller commits with [`PendingReply::finish`].

use std::sync::Arc;
use std::time::SystemTime;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::crypto::{PublicKey, SessionKey, SharedSecret, StaticSecret};
use crate::error::{Error, Result};
use crate::handshake::{
    compose_reply, derive_shared_secret, parse_client_hello, AuthenticationPayload,
    Authenticator, ClientHello, ClientInfo, ProxyRegistry, ReplayGuard, SESSION_ID_SIZE,
};

/// Server-wide handshake context.
///
/// Built once at startup and shared between connections, usually behind an
/// `Arc`. Only the replay guard is mutated after construction.
pub struct ServerState {
    static_secret: StaticSecret,
    proxy_registry: Arc<dyn ProxyRegistry>,
    authenticator: Arc<dyn Authenticator>,
    replay_guard: ReplayGuard,
    clock: fn() -> SystemTime,
}

impl ServerState {
    /// Create a new state with a default replay guard and the system clock.
    pub fn new(
        static_secret: StaticSecret,
        proxy_registry: impl ProxyRegistry + 'static,
        authenticator: impl Authenticator + 'static,
    ) -> Self {
        Self {
            static_secret,
            proxy_registry: Arc::new(proxy_registry),
            authenticator: Arc::new(authenticator),
            replay_guard: ReplayGuard::default(),
            clock: SystemTime::now,
        }
    }

    /// Replace the replay guard.
    pub fn with_replay_guard(mut self, replay_guard: ReplayGuard) -> Self {
        self.replay_guard = replay_guard;
        self
    }

    /// Replace the clock handed to the authenticator.
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    /// The public key clients must be configured with.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.static_secret)
    }

    /// Current time as seen by the authenticator.
    pub fn now(&self) -> SystemTime {
        (self.clock)()
    }

    /// The replay guard.
    pub fn replay_guard(&self) -> &ReplayGuard {
        &self.replay_guard
    }

    /// The enabled proxy methods.
    pub fn proxy_registry(&self) -> &dyn ProxyRegistry {
        self.proxy_registry.as_ref()
    }

    /// Check whether the first packet of a connection is a disguised
    /// ClientHello from a legitimate client.
    ///
    /// On success the caller receives the client's identity together with
    /// a [`PendingReply`]; the server has not written anything yet. On
    /// failure nothing is ever sent to the peer.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedMessage`] - not a parseable disguise-profile hello
    /// * [`Error::Replay`] - the hello random has been seen before
    /// * [`Error::InvalidPublicKey`] - the random is not a usable X25519 key
    /// * [`Error::NotDisguiseClient`] - the covert payload did not authenticate
    /// * [`Error::UnsupportedProxyMethod`] - authenticated, but the method is off
    pub fn prepare_connection(&self, first_packet: &[u8]) -> Result<(ClientInfo, PendingReply)> {
        let client_hello = parse_client_hello(first_packet).map_err(|e| {
            tracing::debug!("bad ClientHello: {}", e);
            Error::MalformedMessage
        })?;

        if self.replay_guard.register(client_hello.random()) {
            tracing::debug!("replayed ClientHello random");
            return Err(Error::Replay);
        }

        let shared_secret = derive_shared_secret(client_hello.random(), &self.static_secret)?;

        let payload = AuthenticationPayload::from_client_hello(&client_hello, shared_secret.clone())
            .map_err(|e| {
                tracing::debug!("unusable covert payload: {}", e);
                Error::NotDisguiseClient
            })?;

        let info = self
            .authenticator
            .authenticate(&payload, self.now())
            .map_err(|e| {
                tracing::debug!("authentication failed: {}", e);
                Error::NotDisguiseClient
            })?;
        drop(payload);

        if !self.proxy_registry.contains(&info.proxy_method) {
            tracing::debug!("client requested unknown proxy method {}", info.proxy_method);
            return Err(Error::UnsupportedProxyMethod(info.proxy_method));
        }

        Ok((
            info,
            PendingReply {
                client_hello,
                shared_secret,
            },
        ))
    }
}

/// The camouflage reply of an accepted handshake, not yet sent.
///
/// Holds exactly what composing the reply needs. [`finish`](Self::finish)
/// consumes it, so a reply can be sent at most once.
#[must_use = "the client is left waiting until the reply is sent with `finish`"]
pub struct PendingReply {
    client_hello: ClientHello,
    shared_secret: SharedSecret,
}

impl PendingReply {
    /// The ClientHello being answered.
    pub fn client_hello(&self) -> &ClientHello {
        &self.client_hello
    }

    fn compose(&self, session_key: &SessionKey) -> Result<Vec<u8>> {
        let session_id: &[u8; SESSION_ID_SIZE] = self.client_hello.session_id()[..]
            .try_into()
            .map_err(|_| Error::MalformedMessage)?;
        compose_reply(session_id, &self.shared_secret, session_key)
    }

    /// Send the reply carrying `session_key` and hand the transport back.
    ///
    /// If the write fails the transport is shut down on a background task
    /// and the write error is returned. Outside a Tokio runtime there is no
    /// task to shut it down on, so the transport is dropped instead.
    pub async fn finish<W>(self, session_key: &SessionKey, mut transport: W) -> Result<W>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let reply = self.compose(session_key)?;

        let written = async {
            transport.write_all(&reply).await?;
            transport.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::debug!("failed to send camouflage reply: {}", e);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        let _ = transport.shutdown().await;
                    });
                }
                Err(_) => drop(transport),
            }
            return Err(Error::TransportWrite(e));
        }

        Ok(transport)
    }
}
