//! # veil
//!
//! Server side of a TLS 1.3 camouflage handshake. A covert client hides an
//! authentication payload inside an ordinary-looking ClientHello; the server
//! recognises it, answers with a ServerHello-shaped reply carrying a fresh
//! session key, and leaves everything else to look like a TLS connection.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Caller (listener, proxy dispatch, fallback)      │
//! ├─────────────────────────────────────────────────────────┤
//! │  ServerState::prepare_connection ─► PendingReply::finish│
//! ├─────────────────────────────────────────────────────────┤
//! │  ClientHello parser · ReplayGuard · reply composer      │
//! ├─────────────────────────────────────────────────────────┤
//! │  Crypto Layer (X25519, AES-256-GCM)                     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::time::SystemTime;
//! use veil::{AuthenticationPayload, ClientInfo, ServerConfig};
//!
//! # async fn run(first_packet: &[u8], conn: tokio::net::TcpStream) -> veil::Result<()> {
//! let mut config = ServerConfig::new_random();
//! config.add_proxy_method("shadowsocks", "127.0.0.1:8388");
//!
//! let state = config.into_state(
//!     |_: &AuthenticationPayload, _: SystemTime| -> veil::Result<ClientInfo> {
//!         Err(veil::Error::authentication("no users configured"))
//!     },
//! )?;
//!
//! let (info, pending) = state.prepare_connection(first_packet)?;
//! let session_key = veil::crypto::SecureRandom::bytes();
//! let conn = pending.finish(&session_key, conn).await?;
//! # let _ = (info, conn);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod crypto;
pub mod error;
pub mod handshake;

pub use error::{Error, Result};
pub use handshake::{
    AuthenticationPayload, Authenticator, ClientHello, ClientInfo, PendingReply, ProxyRegistry,
    ReplayGuard, ServerConfig, ServerConfigFile, ServerState,
};
