#![forbid(unsafe_code)]

//! rum-client: telemetry-submission client for a remote event collector.
//!
//! Applications use this library to report structured user/application
//! events (a name plus free-form attributes) over a persistent, reconnecting
//! connection:
//! - Session and client-instance identity, stable for the process lifetime
//! - Monotonic event-id generation
//! - Signed batch payload assembly (one salt and signature per batch)
//! - A backoff state machine governing reconnection after unexpected
//!   disconnects
//! - Request dispatch with typed classification of transport and
//!   server-reported errors
//!
//! The RPC transport itself (sockets, encryption, framing, multiplexing) is
//! a collaborator behind the [`transport::Transport`] trait, and the shared
//! per-second scheduler is injected as a [`timesource::TimeSource`].

pub mod client;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod ident;
pub mod metrics;
pub mod payload;
pub mod reconnect;
pub mod timesource;
pub mod transport;

pub use client::{ClientObserver, RumClient};
pub use config::{ConfigError, RumConfig};
pub use dispatch::RumError;
pub use event::{EventAttrs, EventRecord, RawEventInput};
pub use transport::{
    EcdhCurve, Handshake, HandshakeOptions, KeyMaterial, KeyStrength, Quest, RawAnswer, Transport,
    TransportError, TransportEvent,
};
