//! Chat Client Seam
//!
//! The WhatsApp wire protocol, encryption, and multi-device session handling
//! live in an external client library. This crate only needs three things
//! from it: connect from an auth directory, emit events, send text. The seam
//! is a factory trait plus a typed event channel consumed by one dispatch
//! loop, so the supervisor can be driven by a scripted client in tests.

pub mod stdio;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection setup failed: {0}")]
    Setup(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("not connected")]
    NotConnected,
}

/// Connection lifecycle as observed through the client's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed { logged_out: bool },
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed { .. } => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// An inbound chat message, already reduced to plain text.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat to reply into (JID for the real transport).
    pub chat: String,
    /// Sender identity, e.g. "1234567890@s.whatsapp.net".
    pub sender: String,
    pub text: String,
    /// Set on the bot's own outgoing messages echoed back by the server.
    pub from_me: bool,
    pub is_group: bool,
}

/// Everything the daemon reacts to, as one sum type on one channel.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The client rotated its local key material; persist the auth directory.
    CredsUpdated,
    ConnectionStateChanged(ConnectionState),
    /// A pairing QR payload is available for an unauthenticated session.
    PairingCode(String),
    MessageReceived(IncomingMessage),
}

/// Handle to a live client connection.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_text(&self, chat: &str, text: &str) -> Result<(), ClientError>;

    /// Invalidate the session server-side. Best-effort during reset; callers
    /// ignore failures so a dead connection cannot block state clearing.
    async fn logout(&self) -> Result<(), ClientError>;
}

/// A freshly connected client plus its event stream.
pub struct Connection {
    pub client: Arc<dyn ChatClient>,
    pub events: mpsc::Receiver<ClientEvent>,
}

/// Creates client connections. The auth directory carries whatever credential
/// files the transport persisted last time; an empty directory starts a fresh
/// pairing flow.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self, auth_dir: &Path) -> Result<Connection, ClientError>;
}
