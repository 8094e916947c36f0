//! Identifier generation and session identity.
//!
//! Every client instance owns its own generators; ids are never shared across
//! instances. Generated ids combine a millisecond timestamp with a bounded
//! per-millisecond sequence counter, which keeps them strictly increasing for
//! up to 999 calls within one millisecond. Wall-clock regression is a
//! documented limitation and is not corrected here.

use uuid::Uuid;

/// Monotonically-ordered 64-bit id generator.
///
/// Maintains a counter in `[1, 999]`; each call increments it (wrapping
/// 999 → 1) and returns `now_ms * 1000 + counter`, the numeric equivalent of
/// concatenating the millisecond timestamp with the counter zero-padded to
/// three digits. The timestamp is supplied by the caller from the shared
/// time source so that ids within one batched send stay consistent.
#[derive(Debug)]
pub struct IdGenerator {
    counter: i64,
}

impl IdGenerator {
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Produce the next id for the given millisecond timestamp.
    pub fn generate(&mut self, now_ms: i64) -> i64 {
        self.counter += 1;
        if self.counter > 999 {
            self.counter = 1;
        }
        now_ms.saturating_mul(1_000).saturating_add(self.counter)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Session and client-instance identity, stable for the life of a client.
///
/// A generator-derived id is pre-computed at construction as the default
/// session id. Both the session id and the client id may be overridden
/// explicitly; otherwise the first event built fixes them (session to the
/// precomputed default, client id to a generated pseudo-UUID). Once fixed
/// they do not rotate.
#[derive(Debug)]
pub struct SessionIdentity {
    init_session: i64,
    session: Option<i64>,
    client_id: Option<String>,
}

impl SessionIdentity {
    pub const fn new(init_session: i64) -> Self {
        Self {
            init_session,
            session: None,
            client_id: None,
        }
    }

    /// Override the session id.
    pub fn set_session(&mut self, id: i64) {
        self.session = Some(id);
    }

    /// Override the client-instance id.
    pub fn set_client_id(&mut self, id: String) {
        self.client_id = Some(id);
    }

    /// Current session id, fixing the precomputed default on first use.
    pub fn session_id(&mut self) -> i64 {
        *self.session.get_or_insert(self.init_session)
    }

    /// Current client-instance id, fixing a generated pseudo-UUID on first use.
    pub fn client_id(&mut self, now_ms: i64) -> String {
        self.client_id
            .get_or_insert_with(|| pseudo_uuid(now_ms))
            .clone()
    }
}

/// Pseudo-random client-instance identifier.
///
/// An uppercase v4-style UUID string with the version character replaced by
/// the literal `s` and the leading characters replaced by the decimal
/// millisecond timestamp, matching the identifier format the collector
/// already indexes on.
fn pseudo_uuid(now_ms: i64) -> String {
    let mut chars: Vec<char> = Uuid::new_v4()
        .hyphenated()
        .to_string()
        .to_uppercase()
        .chars()
        .collect();
    chars[14] = 's';
    let limit = chars.len();
    for (i, digit) in now_ms.to_string().chars().take(limit).enumerate() {
        chars[i] = digit;
    }
    chars.into_iter().collect()
}
