//! Client facade composing identity, payload assembly, dispatch, and the
//! reconnect machine.
//!
//! A client subscribes to the shared per-second tick stream at construction
//! and spawns one driver task that consumes ticks and transport lifecycle
//! events. `destroy` latches the reconnect machine shut, drops the transport
//! handle, and stops the driver; late transport events after that are
//! dropped rather than treated as errors.

use crate::config::{ConfigError, RumConfig};
use crate::dispatch::{self, RumError};
use crate::event::{EventAttrs, RawEventInput};
use crate::ident::{IdGenerator, SessionIdentity};
use crate::metrics::ClientMetrics;
use crate::payload;
use crate::reconnect::{ReconnectController, ReconnectDecision, ReconnectPolicy};
use crate::timesource::TimeSource;
use crate::transport::{Handshake, HandshakeOptions, KeyMaterial, Transport, TransportEvent};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lifecycle notifications for one client instance.
///
/// Registered via [`RumClient::add_observer`]; fan-out to multiple observers
/// is explicit. All methods default to no-ops so observers implement only
/// what they care about.
pub trait ClientObserver: Send + Sync {
    /// The transport was established (initial connect or reconnect).
    fn on_connect(&self) {}

    /// The transport was lost or the client destroyed; the flag reports
    /// whether the reconnect controller will retry.
    fn on_close(&self, _will_reconnect: bool) {}

    /// A transport, protocol, or dispatch error was recorded. Never fatal
    /// to the client.
    fn on_error(&self, _error: &RumError) {}
}

/// Per-client identity and id-generation state.
///
/// One generator for salts and the session seed, one for event ids; neither
/// is shared across client instances.
struct IdentityState {
    identity: SessionIdentity,
    event_ids: IdGenerator,
    salts: IdGenerator,
}

struct ClientInner {
    config: RumConfig,
    time: Arc<dyn TimeSource>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    identity: Mutex<IdentityState>,
    controller: Mutex<ReconnectController>,
    handshake: Mutex<Option<Handshake>>,
    observers: Mutex<Vec<Arc<dyn ClientObserver>>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    metrics: ClientMetrics,
    shutdown: Notify,
}

/// Telemetry-submission client.
///
/// Owns the configuration, the transport handle, and the reconnect state.
/// All operations are non-blocking; completion is the resolution of the
/// returned future. Must be constructed inside a tokio runtime.
pub struct RumClient {
    inner: Arc<ClientInner>,
    driver: JoinHandle<()>,
}

impl RumClient {
    /// Create a client over the given transport and time source.
    ///
    /// Configuration is validated eagerly: an invalid configuration never
    /// produces a connectable client.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending field.
    pub fn new(
        config: RumConfig,
        transport: Arc<dyn Transport>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut salts = IdGenerator::new();
        let init_session = salts.generate(time.now_millis());
        let policy = ReconnectPolicy::new(config.auto_reconnect);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(ClientInner {
            identity: Mutex::new(IdentityState {
                identity: SessionIdentity::new(init_session),
                event_ids: IdGenerator::new(),
                salts,
            }),
            transport: Mutex::new(Some(transport)),
            controller: Mutex::new(ReconnectController::new(policy)),
            handshake: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
            events_tx,
            metrics: ClientMetrics::new(),
            shutdown: Notify::new(),
            time: Arc::clone(&time),
            config,
        });

        let ticks = time.ticks();
        let driver = tokio::spawn(drive(Arc::clone(&inner), ticks, events_rx));

        Ok(Self { inner, driver })
    }

    /// Register a lifecycle observer.
    pub fn add_observer(&self, observer: Arc<dyn ClientObserver>) {
        self.inner.observers.lock().push(observer);
    }

    /// Counters for this client instance.
    pub fn metrics(&self) -> &ClientMetrics {
        &self.inner.metrics
    }

    /// Establish the transport without encryption.
    ///
    /// # Errors
    ///
    /// Returns [`RumError::ClientDestroyed`] after `destroy`, or the
    /// transport's connect failure.
    pub async fn connect(&self) -> Result<(), RumError> {
        *self.inner.handshake.lock() = None;
        self.inner.establish().await
    }

    /// Establish the transport with an encrypted handshake.
    ///
    /// Filesystem-path key material is read asynchronously first; a read
    /// failure falls back to a plain connect. The handshake parameters from
    /// a successful connect are retained and replayed on reconnection.
    ///
    /// # Errors
    ///
    /// Returns [`RumError::ClientDestroyed`] after `destroy`, or the
    /// transport's connect failure.
    pub async fn connect_encrypted(
        &self,
        key_material: KeyMaterial,
        options: HandshakeOptions,
    ) -> Result<(), RumError> {
        let peer_public_key = match key_material {
            KeyMaterial::Raw(bytes) => Some(bytes),
            KeyMaterial::Path(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => Some(bytes),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "failed to read peer key material, connecting unencrypted"
                    );
                    None
                }
            },
        };

        *self.inner.handshake.lock() =
            peer_public_key.map(|key| Handshake::new(Some(key), options));
        self.inner.establish().await
    }

    /// Override the session id for subsequently built events.
    pub fn set_session(&self, session_id: i64) {
        self.inner.identity.lock().identity.set_session(session_id);
    }

    /// Override the client-instance id for subsequently built events.
    pub fn set_client_id(&self, client_id: impl Into<String>) {
        self.inner
            .identity
            .lock()
            .identity
            .set_client_id(client_id.into());
    }

    /// Report one event.
    ///
    /// # Errors
    ///
    /// See [`RumError`]; parameter errors are returned before the transport
    /// is contacted.
    pub async fn custom_event(
        &self,
        name: &str,
        attrs: EventAttrs,
        timeout: Option<Duration>,
    ) -> Result<Value, RumError> {
        self.submit(&[RawEventInput::new(name, attrs)], timeout).await
    }

    /// Report a batch of events as one atomic signed payload.
    ///
    /// Malformed entries are dropped silently (logged with a count);
    /// a batch with nothing well-formed left is a parameter error.
    ///
    /// # Errors
    ///
    /// See [`RumError`]; parameter errors are returned before the transport
    /// is contacted.
    pub async fn custom_events(
        &self,
        events: &[RawEventInput],
        timeout: Option<Duration>,
    ) -> Result<Value, RumError> {
        self.submit(events, timeout).await
    }

    /// Destroy the client: latch the reconnect machine shut, close and drop
    /// the transport handle, and detach from the tick stream.
    ///
    /// In-flight sends observe [`RumError::ClientDestroyed`] on their next
    /// transport access; transport events still in flight are dropped.
    pub async fn destroy(&self) {
        self.inner.controller.lock().on_closed_by_user();
        let transport = self.inner.transport.lock().take();
        self.inner.shutdown.notify_one();
        if let Some(transport) = transport {
            transport.close().await;
        }
        self.inner.notify_close(false);
    }

    async fn submit(
        &self,
        raw: &[RawEventInput],
        timeout: Option<Duration>,
    ) -> Result<Value, RumError> {
        let inner = &self.inner;
        let now_ms = inner.time.now_millis();

        let batch = {
            let mut state = inner.identity.lock();
            let IdentityState {
                identity,
                event_ids,
                salts,
            } = &mut *state;
            payload::assemble(
                raw,
                inner.config.project_id,
                &inner.config.secret,
                identity,
                event_ids,
                salts,
                now_ms,
            )
        };

        let Some(batch) = batch else {
            return Err(RumError::EmptyBatch);
        };

        if batch.dropped > 0 {
            inner.metrics.record_dropped(batch.dropped as u64);
            warn!(dropped = batch.dropped, "dropped malformed event entries");
        }

        let timeout = timeout.unwrap_or(Duration::from_millis(inner.config.timeout_ms));
        inner.metrics.record_send(batch.payload.events.len() as u64);

        let result = dispatch::dispatch(inner.transport_handle(), &batch.payload, timeout).await;
        if let Err(error) = &result {
            inner.metrics.record_send_failure();
            inner.record_error(error);
        }
        result
    }
}

impl Drop for RumClient {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl ClientInner {
    fn transport_handle(&self) -> Option<Arc<dyn Transport>> {
        self.transport.lock().clone()
    }

    fn observers_snapshot(&self) -> Vec<Arc<dyn ClientObserver>> {
        self.observers.lock().clone()
    }

    fn notify_connect(&self) {
        for observer in self.observers_snapshot() {
            observer.on_connect();
        }
    }

    fn notify_close(&self, will_reconnect: bool) {
        for observer in self.observers_snapshot() {
            observer.on_close(will_reconnect);
        }
    }

    fn record_error(&self, error: &RumError) {
        self.metrics.record_error();
        if self.config.debug {
            warn!(error = %error, "recorded client error");
        } else {
            debug!(error = %error, "recorded client error");
        }
        for observer in self.observers_snapshot() {
            observer.on_error(error);
        }
    }

    /// Open the transport, replaying any previously captured handshake.
    async fn establish(&self) -> Result<(), RumError> {
        let Some(transport) = self.transport_handle() else {
            return Err(RumError::ClientDestroyed);
        };
        let handshake = self.handshake.lock().clone();

        match transport.open(self.events_tx.clone(), handshake.as_ref()).await {
            Ok(()) => {
                self.controller.lock().on_connected();
                debug!(
                    host = %self.config.host,
                    port = self.config.port,
                    encrypted = handshake.is_some(),
                    "transport established"
                );
                self.notify_connect();
                Ok(())
            }
            Err(error) => {
                let error = RumError::Transport(error);
                self.record_error(&error);
                Err(error)
            }
        }
    }

    /// Handle one observed disconnect, firing immediate reconnect attempts
    /// while the controller's cycle budget allows.
    async fn handle_disconnect(&self) {
        loop {
            if self.controller.lock().is_closed() {
                // Late event on a destroyed client.
                return;
            }

            let now_ms = self.time.now_millis();
            let decision = self.controller.lock().on_unexpected_close(now_ms);
            let will_reconnect = !matches!(decision, ReconnectDecision::Ignore);
            self.notify_close(will_reconnect);

            match decision {
                ReconnectDecision::Reconnect => {
                    self.metrics.record_reconnect_attempt();
                    if self.establish().await.is_ok() {
                        return;
                    }
                    // The failed attempt closed again; consult the
                    // controller for the next step.
                }
                ReconnectDecision::Scheduled | ReconnectDecision::Ignore => return,
            }
        }
    }

    async fn handle_tick(&self, now_ms: i64) {
        let decision = self.controller.lock().on_tick(now_ms);
        if matches!(decision, ReconnectDecision::Reconnect) {
            self.metrics.record_reconnect_attempt();
            if self.establish().await.is_err() {
                self.handle_disconnect().await;
            }
        }
    }
}

/// Driver loop: one per client, consuming scheduler ticks and transport
/// lifecycle events until shutdown.
async fn drive(
    inner: Arc<ClientInner>,
    mut ticks: broadcast::Receiver<i64>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    loop {
        tokio::select! {
            _ = inner.shutdown.notified() => break,
            tick = ticks.recv() => match tick {
                Ok(now_ms) => inner.handle_tick(now_ms).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "tick stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            event = events.recv() => match event {
                Some(TransportEvent::Closed) => inner.handle_disconnect().await,
                Some(TransportEvent::Error(error)) => {
                    inner.record_error(&RumError::Transport(error));
                }
                None => break,
            },
        }
    }
    debug!("client driver stopped");
}
