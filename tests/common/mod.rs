//! Shared fakes for client-level tests: a scriptable transport and a
//! recording observer.

use async_trait::async_trait;
use rum_client::{
    ClientObserver, Handshake, Quest, RawAnswer, RumError, Transport, TransportError,
    TransportEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Transport double that records every open and send, can be scripted to
/// fail upcoming opens, and can drop the "connection" by pushing a close
/// event through the channel handed over at open.
pub struct RecordingTransport {
    opens: Mutex<Vec<Option<Handshake>>>,
    quests: Mutex<Vec<Quest>>,
    answer: Mutex<RawAnswer>,
    fail_next_opens: AtomicUsize,
    events_tx: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    close_calls: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            opens: Mutex::new(Vec::new()),
            quests: Mutex::new(Vec::new()),
            answer: Mutex::new(RawAnswer {
                message_type: 2,
                status: 0,
                payload: Some(b"{}".to_vec()),
            }),
            fail_next_opens: AtomicUsize::new(0),
            events_tx: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().expect("lock").len()
    }

    pub fn open_handshakes(&self) -> Vec<Option<Handshake>> {
        self.opens.lock().expect("lock").clone()
    }

    pub fn sent_quests(&self) -> Vec<Quest> {
        self.quests.lock().expect("lock").clone()
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Script the answer returned by every subsequent send.
    pub fn set_answer(&self, answer: RawAnswer) {
        *self.answer.lock().expect("lock") = answer;
    }

    /// Make the next `count` open calls fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.fail_next_opens.store(count, Ordering::SeqCst);
    }

    /// Simulate an unexpected connection loss.
    pub fn drop_connection(&self) {
        if let Some(events) = self.events_tx.lock().expect("lock").as_ref() {
            let _ = events.send(TransportEvent::Closed);
        }
    }

    /// Push a transport-level error event.
    pub fn raise_error(&self, error: TransportError) {
        if let Some(events) = self.events_tx.lock().expect("lock").as_ref() {
            let _ = events.send(TransportEvent::Error(error));
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn open(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
        handshake: Option<&Handshake>,
    ) -> Result<(), TransportError> {
        self.opens.lock().expect("lock").push(handshake.cloned());

        let remaining = self.fail_next_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::ConnectionFailed {
                reason: "scripted failure".to_owned(),
            });
        }

        *self.events_tx.lock().expect("lock") = Some(events);
        Ok(())
    }

    async fn send(&self, quest: Quest, _timeout: Duration) -> Result<RawAnswer, TransportError> {
        self.quests.lock().expect("lock").push(quest);
        Ok(self.answer.lock().expect("lock").clone())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observer double recording every notification.
#[derive(Default)]
pub struct RecordingObserver {
    connects: AtomicUsize,
    closes: Mutex<Vec<bool>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> Vec<bool> {
        self.closes.lock().expect("lock").clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("lock").clone()
    }
}

impl ClientObserver for RecordingObserver {
    fn on_connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn on_close(&self, will_reconnect: bool) {
        self.closes.lock().expect("lock").push(will_reconnect);
    }

    fn on_error(&self, error: &RumError) {
        self.errors.lock().expect("lock").push(error.to_string());
    }
}

/// Poll until `condition` holds, yielding to the client driver in between.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within two seconds");
}

/// Give the client driver a short window to process anything pending.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
