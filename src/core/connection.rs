//! Push connection - demultiplexes named server events to channel listeners
//!
//! One `Connection` models one long-lived push-event stream. The producer
//! side calls [`Connection::deliver`] with a channel name and payload;
//! listeners attached to that channel receive the events in arrival order.
//! Lifecycle is one-way Open -> Closing -> Closed, and `close()` is
//! idempotent because the close-event path and the cancellation path can
//! race to invoke it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Channel carrying JSON-encoded batches of project records
pub const RECORD_CHANNEL: &str = "record-channel";
/// Channel signalling end of stream (payload content unused)
pub const CLOSE_CHANNEL: &str = "close-channel";

const STATE_OPEN: u8 = 0;
const STATE_CLOSING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

/// One named event routed through the connection
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub channel: String,
    pub payload: String,
}

struct Inner {
    listeners: Mutex<HashMap<String, mpsc::UnboundedSender<PushEvent>>>,
    state: AtomicU8,
    fault: Mutex<Option<String>>,
}

/// Handle to one live push connection plus its event-type listeners.
///
/// Clones share the same underlying connection; the owning stream source
/// is the only entity that may tear it down.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: Mutex::new(HashMap::new()),
                state: AtomicU8::new(STATE_OPEN),
                fault: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.inner.state.load(Ordering::Acquire) {
            STATE_OPEN => ConnectionState::Open,
            STATE_CLOSING => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Attach a listener sender to a named channel.
    ///
    /// At most one listener per channel; attaching again replaces the
    /// previous one. Routing several channels to one sender keeps their
    /// events in total arrival order. No-op on a closed connection.
    pub fn attach(&self, channel: &str, tx: mpsc::UnboundedSender<PushEvent>) {
        if self.state() == ConnectionState::Open {
            self.inner
                .listeners
                .lock()
                .unwrap()
                .insert(channel.to_string(), tx);
        }
    }

    /// Attach a fresh listener and return its receiving end.
    ///
    /// On a closed connection the returned receiver is already ended.
    pub fn subscribe(&self, channel: &str) -> mpsc::UnboundedReceiver<PushEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attach(channel, tx);
        // tx dropped here when closed, so rx ends immediately
        rx
    }

    /// Drop the listener for a named channel, if any.
    pub fn unsubscribe(&self, channel: &str) {
        self.inner.listeners.lock().unwrap().remove(channel);
    }

    /// Route one event to the listener attached to `channel`.
    ///
    /// Returns false when the connection is closed or nobody listens;
    /// such events are dropped.
    pub fn deliver(&self, channel: &str, payload: impl Into<String>) -> bool {
        if self.state() != ConnectionState::Open {
            log::debug!("dropping {} event: connection not open", channel);
            return false;
        }
        let listeners = self.inner.listeners.lock().unwrap();
        match listeners.get(channel) {
            Some(tx) => tx
                .send(PushEvent {
                    channel: channel.to_string(),
                    payload: payload.into(),
                })
                .is_ok(),
            None => {
                log::debug!("dropping {} event: no listener", channel);
                false
            }
        }
    }

    /// Close the connection and drop all listener registrations.
    ///
    /// Exactly one caller performs the transition; every later (or
    /// concurrent) call is a no-op. Closed is terminal, the handle is not
    /// reusable.
    pub fn close(&self) {
        if self
            .inner
            .state
            .compare_exchange(
                STATE_OPEN,
                STATE_CLOSING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        self.inner.listeners.lock().unwrap().clear();
        self.inner.state.store(STATE_CLOSED, Ordering::Release);
        log::debug!("push connection closed");
    }

    /// Record a transport failure and close.
    ///
    /// The owning stream source reads the fault back to surface the
    /// failure to its subscriber as a terminal error.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("push transport failed: {}", reason);
        *self.inner.fault.lock().unwrap() = Some(reason);
        self.close();
    }

    /// The recorded transport fault, if the connection was aborted.
    pub fn fault(&self) -> Option<String> {
        self.inner.fault.lock().unwrap().clone()
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}
