//! Server configuration.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, StaticSecret};
use crate::error::{Error, Result};
use crate::handshake::{
    Authenticator, ReplayGuard, ServerState, DEFAULT_REPLAY_CAPACITY, DEFAULT_REPLAY_WINDOW,
};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Server's static secret key
    pub static_secret: StaticSecret,
    /// Enabled proxy methods and the upstream address each one forwards to
    pub proxy_book: HashMap<String, String>,
    /// How long a ClientHello random is remembered
    pub replay_window: Duration,
    /// Maximum number of remembered randoms
    pub replay_capacity: usize,
}

impl ServerConfig {
    /// Create a new configuration with a random keypair and no proxy methods.
    pub fn new_random() -> Self {
        Self {
            static_secret: StaticSecret::random(),
            proxy_book: HashMap::new(),
            replay_window: DEFAULT_REPLAY_WINDOW,
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
        }
    }

    /// Get the server's public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.static_secret)
    }

    /// Enable a proxy method, replacing any previous upstream for it.
    pub fn add_proxy_method(&mut self, method: impl Into<String>, upstream: impl Into<String>) {
        self.proxy_book.insert(method.into(), upstream.into());
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.proxy_book.is_empty() {
            return Err(Error::config("at least one proxy method must be configured"));
        }
        if let Some(method) = self.proxy_book.keys().find(|m| m.is_empty()) {
            return Err(Error::config(format!("invalid proxy method name {:?}", method)));
        }
        if self.static_secret.to_bytes() == [0u8; 32] {
            return Err(Error::config("private_key cannot be all zeros"));
        }
        if self.replay_window.is_zero() {
            return Err(Error::config("replay_window_secs must be positive"));
        }
        if self.replay_capacity == 0 {
            return Err(Error::config("replay_capacity must be positive"));
        }
        Ok(())
    }

    /// Validate and build the shared handshake state.
    pub fn into_state(self, authenticator: impl Authenticator + 'static) -> Result<ServerState> {
        self.validate()?;

        let replay_guard = ReplayGuard::new(self.replay_window, self.replay_capacity);
        Ok(
            ServerState::new(self.static_secret, self.proxy_book, authenticator)
                .with_replay_guard(replay_guard),
        )
    }
}

fn default_replay_window_secs() -> u64 {
    DEFAULT_REPLAY_WINDOW.as_secs()
}

fn default_replay_capacity() -> usize {
    DEFAULT_REPLAY_CAPACITY
}

/// Configuration file format for serialization.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfigFile {
    /// Server's static secret key (base64)
    pub private_key: String,
    /// Replay window (seconds)
    #[serde(default = "default_replay_window_secs")]
    pub replay_window_secs: u64,
    /// Maximum remembered randoms
    #[serde(default = "default_replay_capacity")]
    pub replay_capacity: usize,
    /// Proxy method -> upstream address
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub proxy_book: BTreeMap<String, String>,
}

impl ServerConfigFile {
    /// Parse a TOML document.
    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::config(format!("invalid config file: {}", e)))
    }

    /// Render as a TOML document.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::config(format!("cannot serialize config: {}", e)))
    }

    /// Convert to runtime configuration.
    pub fn to_config(&self) -> Result<ServerConfig> {
        let secret_bytes = STANDARD
            .decode(self.private_key.trim())
            .map_err(|e| Error::config(format!("invalid base64 private_key: {}", e)))?;

        let secret: [u8; 32] = secret_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::config("private_key must be 32 bytes"))?;

        Ok(ServerConfig {
            static_secret: StaticSecret::from_bytes(secret),
            proxy_book: self
                .proxy_book
                .iter()
                .map(|(method, upstream)| (method.clone(), upstream.clone()))
                .collect(),
            replay_window: Duration::from_secs(self.replay_window_secs),
            replay_capacity: self.replay_capacity,
        })
    }

    /// Create from runtime configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            private_key: STANDARD.encode(config.static_secret.to_bytes()),
            replay_window_secs: config.replay_window.as_secs(),
            replay_capacity: config.replay_capacity,
            proxy_book: config
                .proxy_book
                .iter()
                .map(|(method, upstream)| (method.clone(), upstream.clone()))
                .collect(),
        }
    }
}
