//! Coordinator - wires stream sources into the shared cell
//!
//! Owns the one subscription linking a stream source's fragment sequence
//! to [`SharedStateCell::publish`]. At most one stream is active; starting
//! a new one tears the previous source down first.

use super::cell::{SharedStateCell, SubscriptionHandle};
use super::connection::Connection;
use super::model::GraphFragment;
use super::stream::{self, StreamSource};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PUMP_STREAMING: u8 = 0;
const PUMP_CLOSED: u8 = 1;
const PUMP_FAILED: u8 = 2;

/// Connection state surfaced to consumers.
///
/// Without this, an unrecovered transport error silently stops chart
/// updates; callers poll `status()` to notice and restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Idle,
    Streaming,
    /// Stream ended cleanly via the close signal
    Closed,
    /// Stream ended with a terminal error; restart via `start_stream`
    Failed,
}

struct ActiveStream {
    connection: Connection,
    pump: JoinHandle<()>,
    state: Arc<AtomicU8>,
}

/// Pipeline orchestrator enforcing at-most-one-active-stream
pub struct Coordinator {
    cell: SharedStateCell,
    active: Option<ActiveStream>,
}

impl Coordinator {
    pub fn new(cell: SharedStateCell) -> Self {
        Self { cell, active: None }
    }

    /// Start ingesting from `connection`, replacing any active stream.
    ///
    /// The prior source's teardown runs to completion before the new
    /// stream is created, so no fragment from the old stream lands after
    /// one from the new.
    pub fn start_stream(&mut self, connection: Connection) {
        self.stop_active();

        let mut fragments = StreamSource::new(connection.clone()).run();
        let cell = self.cell.clone();
        let state = Arc::new(AtomicU8::new(PUMP_STREAMING));
        let pump_state = state.clone();

        let pump = tokio::spawn(async move {
            loop {
                match fragments.next().await {
                    Some(Ok(fragment)) => cell.publish(fragment),
                    Some(Err(e)) => {
                        log::error!("stream failed: {}", e);
                        pump_state.store(PUMP_FAILED, Ordering::Release);
                        break;
                    }
                    None => {
                        log::info!("stream ended");
                        pump_state.store(PUMP_CLOSED, Ordering::Release);
                        break;
                    }
                }
            }
        });

        self.active = Some(ActiveStream {
            connection,
            pump,
            state,
        });
    }

    /// Subscribe to every fragment published from this moment on.
    pub fn observe_updates(&self) -> (SubscriptionHandle, mpsc::UnboundedReceiver<GraphFragment>) {
        self.cell.subscribe()
    }

    pub fn status(&self) -> StreamStatus {
        match &self.active {
            None => StreamStatus::Idle,
            Some(active) => match active.state.load(Ordering::Acquire) {
                PUMP_STREAMING => StreamStatus::Streaming,
                PUMP_CLOSED => StreamStatus::Closed,
                _ => StreamStatus::Failed,
            },
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.status() == StreamStatus::Streaming
    }

    pub fn cell(&self) -> &SharedStateCell {
        &self.cell
    }

    /// Cancel the active stream, if any, and return to idle.
    pub fn shutdown(&mut self) {
        self.stop_active();
    }

    fn stop_active(&mut self) {
        if let Some(active) = self.active.take() {
            if !active.connection.is_closed() {
                log::info!("tearing down active stream");
            }
            stream::teardown(&active.connection);
            // drop the pump rather than let stale fragments race a new stream
            active.pump.abort();
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cell::PublishMode;
    use crate::core::connection::{CLOSE_CHANNEL, RECORD_CHANNEL};
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_fragments_reach_observers() {
        let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));
        let (_handle, mut updates) = coordinator.observe_updates();

        let conn = Connection::new();
        coordinator.start_stream(conn.clone());
        assert_eq!(coordinator.status(), StreamStatus::Streaming);

        conn.deliver(RECORD_CHANNEL, r#"[{"id":"P1","sprints":[{"id":"S1"}]}]"#);
        let fragment = updates.recv().await.unwrap();
        assert_eq!(fragment.tasks.len(), 2);

        conn.deliver(CLOSE_CHANNEL, "{}");
        while coordinator.status() == StreamStatus::Streaming {
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(coordinator.status(), StreamStatus::Closed);
    }

    #[tokio::test]
    async fn test_start_stream_replaces_active() {
        let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));
        let (_handle, mut updates) = coordinator.observe_updates();

        let first = Connection::new();
        coordinator.start_stream(first.clone());

        let second = Connection::new();
        coordinator.start_stream(second.clone());

        // prior connection torn down before the new stream publishes
        assert!(first.is_closed());
        assert!(!second.is_closed());

        second.deliver(RECORD_CHANNEL, r#"[{"id":"P2"}]"#);
        let fragment = updates.recv().await.unwrap();
        assert_eq!(fragment.tasks[0].id, "P2");
    }

    #[tokio::test]
    async fn test_failure_surfaces_in_status() {
        let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));
        let conn = Connection::new();
        coordinator.start_stream(conn.clone());

        conn.deliver(RECORD_CHANNEL, "not json");
        while coordinator.status() == StreamStatus::Streaming {
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(coordinator.status(), StreamStatus::Failed);

        // retry is a fresh start_stream
        let retry = Connection::new();
        coordinator.start_stream(retry);
        assert_eq!(coordinator.status(), StreamStatus::Streaming);
    }

    #[tokio::test]
    async fn test_shutdown_returns_to_idle() {
        let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));
        let conn = Connection::new();
        coordinator.start_stream(conn.clone());

        coordinator.shutdown();
        assert_eq!(coordinator.status(), StreamStatus::Idle);
        assert!(conn.is_closed());
    }
}
