//! Error types for the camouflage handshake.

use thiserror::Error;

/// Result type alias for handshake operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while accepting a disguised handshake.
///
/// Rejection variants are coarse; the detailed reason is only logged.
#[derive(Error, Debug)]
pub enum Error {
    /// The first packet is not a well-formed ClientHello
    #[error("non (or malformed) ClientHello")]
    MalformedMessage,

    /// The ClientHello random does not encode a usable ephemeral key
    #[error("invalid ephemeral public key")]
    InvalidPublicKey,

    /// TLS-shaped, but not from a disguise-aware client
    #[error("TLS but not a disguise-aware ClientHello")]
    NotDisguiseClient,

    /// The ClientHello random has been seen before
    #[error("duplicate random")]
    Replay,

    /// Authenticated, but the requested proxy method is not offered
    #[error("unsupported proxy method: {0}")]
    UnsupportedProxyMethod(String),

    /// The camouflage reply could not be written to the transport
    #[error("failed to write reply: {0}")]
    TransportWrite(#[source] std::io::Error),

    /// Rejection reported by an authenticator implementation
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Cryptographic operation failed
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new cryptographic error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Error::Crypto(msg.into())
    }

    /// Create a new authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Error::Authentication(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check if the attempt looked like an ordinary TLS client or a probe.
    ///
    /// Connections rejected this way can still be handed to a real TLS
    /// server by the caller.
    pub fn is_probe(&self) -> bool {
        matches!(
            self,
            Error::MalformedMessage | Error::InvalidPublicKey | Error::NotDisguiseClient
        )
    }

    /// Check if this error is a replayed handshake
    pub fn is_replay(&self) -> bool {
        matches!(self, Error::Replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Replay;
        assert_eq!(err.to_string(), "duplicate random");

        let err = Error::UnsupportedProxyMethod("openvpn".into());
        assert_eq!(err.to_string(), "unsupported proxy method: openvpn");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::MalformedMessage.is_probe());
        assert!(Error::InvalidPublicKey.is_probe());
        assert!(Error::NotDisguiseClient.is_probe());
        assert!(!Error::Replay.is_probe());
        assert!(Error::Replay.is_replay());
        assert!(!Error::UnsupportedProxyMethod("x".into()).is_probe());
    }
}
