//! Outbound event model.
//!
//! Events are built once, immediately before a send, and are fire-and-forget:
//! nothing is persisted beyond the single send attempt. Field names on the
//! wire follow the collector's schema (`ev`, `sid`, `rid`, `ts`, `eid`,
//! `source`, `attrs`).

use crate::ident::{IdGenerator, SessionIdentity};
use serde::{Deserialize, Serialize};

/// Source tag stamped on every event built by this client.
pub const SOURCE_TAG: &str = "rust";

/// Open attribute map attached to an event.
///
/// Values are forwarded verbatim; the only contract is that they are
/// serializable by the payload codec. There is no compile-time schema.
pub type EventAttrs = serde_json::Map<String, serde_json::Value>;

/// One caller-supplied batch entry: an event name plus its attributes.
///
/// An entry with an empty name is considered malformed and is dropped during
/// payload assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEventInput {
    /// Event name
    pub name: String,
    /// Attribute map
    pub attrs: EventAttrs,
}

impl RawEventInput {
    pub fn new(name: impl Into<String>, attrs: EventAttrs) -> Self {
        Self {
            name: name.into(),
            attrs,
        }
    }
}

/// One fully-stamped outbound event record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    /// Event name
    #[serde(rename = "ev")]
    pub name: String,
    /// Session id grouping events from one logical client session
    #[serde(rename = "sid")]
    pub session_id: i64,
    /// Client-instance id
    #[serde(rename = "rid")]
    pub client_id: String,
    /// Timestamp in seconds
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Unique event id, one per generator per process
    #[serde(rename = "eid")]
    pub event_id: i64,
    /// Runtime platform tag
    pub source: String,
    /// Caller-supplied attributes, forwarded verbatim
    pub attrs: EventAttrs,
}

/// Assemble one event record from a name and attribute map.
///
/// Pulls the current timestamp from the shared clock, a fresh event id from
/// the event generator, and the current (lazily fixed) session identity.
pub(crate) fn build_event(
    name: &str,
    attrs: EventAttrs,
    identity: &mut SessionIdentity,
    event_ids: &mut IdGenerator,
    now_ms: i64,
) -> EventRecord {
    EventRecord {
        name: name.to_owned(),
        session_id: identity.session_id(),
        client_id: identity.client_id(now_ms),
        timestamp: now_ms / 1_000,
        event_id: event_ids.generate(now_ms),
        source: SOURCE_TAG.to_owned(),
        attrs,
    }
}
