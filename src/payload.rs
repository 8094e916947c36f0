//! Signed payload assembly.
//!
//! A batch of events is signed and transmitted as one payload: one salt, one
//! signature, events in caller order. The salt is a fresh generator id used
//! once as a nonce, so the signature must be recomputed for every assembly
//! and is never cached across payloads.

use crate::event::{EventRecord, RawEventInput};
use crate::ident::{IdGenerator, SessionIdentity};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Request payload carrying a signed batch of events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SigningPayload {
    /// Project identifier
    #[serde(rename = "pid")]
    pub project_id: u32,
    /// Integrity signature over (project id, secret, salt)
    #[serde(rename = "sign")]
    pub signature: String,
    /// Single-use nonce for this payload
    pub salt: i64,
    /// Events in caller order, malformed entries removed
    pub events: Vec<EventRecord>,
}

/// Result of assembling a raw batch: the signed payload plus how many
/// malformed entries were dropped on the way.
#[derive(Debug)]
pub struct AssembledBatch {
    pub payload: SigningPayload,
    pub dropped: usize,
}

/// Assemble a signed payload from caller-supplied batch entries.
///
/// Entries lacking a name are dropped silently, preserving the order of the
/// rest. Returns `None` when nothing well-formed remains; callers must treat
/// that as a parameter error and not attempt a send.
#[allow(clippy::too_many_arguments)]
pub(crate) fn assemble(
    raw: &[RawEventInput],
    project_id: u32,
    secret: &str,
    identity: &mut SessionIdentity,
    event_ids: &mut IdGenerator,
    salts: &mut IdGenerator,
    now_ms: i64,
) -> Option<AssembledBatch> {
    let mut events = Vec::with_capacity(raw.len());
    for entry in raw {
        if entry.name.is_empty() {
            continue;
        }
        events.push(crate::event::build_event(
            &entry.name,
            entry.attrs.clone(),
            identity,
            event_ids,
            now_ms,
        ));
    }

    if events.is_empty() {
        return None;
    }

    let dropped = raw.len() - events.len();
    let salt = salts.generate(now_ms);
    let payload = SigningPayload {
        project_id,
        signature: sign(project_id, secret, salt),
        salt,
        events,
    };

    Some(AssembledBatch { payload, dropped })
}

/// Compute the uppercase-hex MD5 signature over `project_id:secret:salt`.
pub(crate) fn sign(project_id: u32, secret: &str, salt: i64) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{project_id}:{secret}:{salt}"));
    hex::encode_upper(hasher.finalize())
}
