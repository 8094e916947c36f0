//! Transport collaborator seam.
//!
//! The underlying RPC connection (sockets, handshake/encryption, framing,
//! request multiplexing) lives behind the [`Transport`] trait. The client
//! hands the transport a channel sender at `open`; the transport pushes
//! lifecycle events through it for as long as the connection lives, and
//! resolves each `send` with a decoded raw answer or a transport error.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Message type tag marking a frame as an answer to a request.
pub const MSG_TYPE_ANSWER: u8 = 2;

/// Transport-level failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Connection refused by {endpoint}")]
    ConnectionRefused { endpoint: String },

    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One outbound request: a method tag, a flag, and the encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quest {
    pub method: String,
    pub flag: u8,
    pub payload: Vec<u8>,
}

/// One raw response frame as decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnswer {
    /// Frame message type ([`MSG_TYPE_ANSWER`] for answers)
    pub message_type: u8,
    /// Status code; non-zero on an answer marks a server-reported error
    pub status: u8,
    /// Encoded application body, if the frame carried one
    pub payload: Option<Vec<u8>>,
}

impl RawAnswer {
    /// Whether this frame is an answer flagged as a server-reported error.
    pub const fn is_answer_error(&self) -> bool {
        self.message_type == MSG_TYPE_ANSWER && self.status != 0
    }
}

/// Lifecycle notifications pushed by the transport after a successful open.
#[derive(Debug)]
#[non_exhaustive]
pub enum TransportEvent {
    /// The connection dropped without the client asking for it
    Closed,
    /// A transport-level error surfaced outside any single request
    Error(TransportError),
}

/// Elliptic curve for the optional encrypted handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum EcdhCurve {
    #[default]
    Secp256k1,
    Secp256r1,
    Secp224r1,
    Secp192r1,
}

/// Negotiated key strength for the encrypted handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum KeyStrength {
    #[default]
    Bits128,
    Bits256,
}

/// Caller-facing handshake knobs for an encrypted connect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandshakeOptions {
    pub curve: EcdhCurve,
    pub strength: KeyStrength,
    pub stream_mode: bool,
}

/// Handshake parameters captured from a successful encrypted connect.
///
/// Retained by the client so that reconnection replays the same negotiated
/// parameters instead of renegotiating from defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub peer_public_key: Option<Vec<u8>>,
    pub curve: EcdhCurve,
    pub strength: KeyStrength,
    pub stream_mode: bool,
}

impl Handshake {
    pub fn new(peer_public_key: Option<Vec<u8>>, options: HandshakeOptions) -> Self {
        Self {
            peer_public_key,
            curve: options.curve,
            strength: options.strength,
            stream_mode: options.stream_mode,
        }
    }
}

/// Peer public key material for an encrypted connect.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum KeyMaterial {
    /// Raw key bytes
    Raw(Vec<u8>),
    /// Filesystem path to the key, read asynchronously before connecting
    Path(PathBuf),
}

/// The RPC transport collaborator.
///
/// Implementations own the socket, the optional encryption layer, the wire
/// framing, and request multiplexing. All methods are non-blocking; `send`
/// resolves with the correlated answer or a transport error (including
/// timeouts past the advisory `timeout`).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection, optionally performing an encrypted
    /// handshake with the given parameters.
    ///
    /// The transport keeps `events` and pushes lifecycle notifications
    /// through it until the connection is closed.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the connection cannot be
    /// established.
    async fn open(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
        handshake: Option<&Handshake>,
    ) -> Result<(), TransportError>;

    /// Send one request and resolve with its correlated answer.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on connection loss or when the remote
    /// does not answer within `timeout`.
    async fn send(&self, quest: Quest, timeout: Duration) -> Result<RawAnswer, TransportError>;

    /// Tear the connection down. Idempotent.
    async fn close(&self);
}
