//! Stream source - pumps push events into transformed graph fragments
//!
//! Owns one [`Connection`] exclusively. Listens on `record-channel` and
//! `close-channel` through a single ordered queue, transforms every record
//! payload into one fragment, and emits fragments downstream in
//! payload-arrival order. Teardown is one shared routine used by both exit
//! paths (close event and consumer cancellation), safe to run any number
//! of times.

use super::connection::{Connection, CLOSE_CHANNEL, RECORD_CHANNEL};
use super::model::{GraphFragment, RawProjectRecord};
use super::transform;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Terminal stream failures, surfaced as the last item of a fragment
/// sequence. There is no retry at this layer; the coordinator may start
/// a fresh stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("malformed record payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("push transport failed: {0}")]
    Transport(String),
}

/// Unsubscribe both channel listeners and close the connection.
///
/// Shared between the close-event path, consumer cancellation, and
/// coordinator-initiated replacement; all of them may race, so every step
/// is idempotent.
pub fn teardown(connection: &Connection) {
    connection.unsubscribe(RECORD_CHANNEL);
    connection.unsubscribe(CLOSE_CHANNEL);
    connection.close();
}

/// Ingestion source for one push connection
pub struct StreamSource {
    connection: Connection,
}

impl StreamSource {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Spawn the ingest loop and hand back the fragment sequence.
    ///
    /// The sequence ends cleanly after a `close-channel` event, or with one
    /// terminal error on a malformed payload or transport fault. Each
    /// `record-channel` payload yields exactly one emission. Record events
    /// still queued behind a close event are discarded.
    pub fn run(self) -> FragmentStream {
        // Both channels feed one queue so cross-channel arrival order holds.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        self.connection.attach(RECORD_CHANNEL, event_tx.clone());
        self.connection.attach(CLOSE_CHANNEL, event_tx);

        let (tx, rx) = mpsc::unbounded_channel();
        let connection = self.connection.clone();

        let task = tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Some(event) if event.channel == CLOSE_CHANNEL => {
                        log::info!("close signal received, ending stream");
                        break;
                    }
                    Some(event) => {
                        match serde_json::from_str::<Vec<RawProjectRecord>>(&event.payload) {
                            Ok(records) => {
                                let fragment = transform::fold_records(&records);
                                log::debug!(
                                    "fragment: {} tasks, {} links",
                                    fragment.tasks.len(),
                                    fragment.links.len()
                                );
                                if tx.send(Ok(fragment)).is_err() {
                                    // consumer went away
                                    break;
                                }
                            }
                            Err(e) => {
                                log::error!("malformed record payload: {}", e);
                                let _ = tx.send(Err(StreamError::MalformedPayload(e)));
                                break;
                            }
                        }
                    }
                    None => {
                        // listeners dropped underneath us - torn down elsewhere
                        if let Some(reason) = connection.fault() {
                            let _ = tx.send(Err(StreamError::Transport(reason)));
                        }
                        break;
                    }
                }
            }
            teardown(&connection);
        });

        FragmentStream {
            rx,
            connection: self.connection,
            task,
        }
    }
}

/// Consumer end of a running stream source.
///
/// Dropping the stream cancels it; the underlying connection is torn down
/// on every exit path.
pub struct FragmentStream {
    rx: mpsc::UnboundedReceiver<Result<GraphFragment, StreamError>>,
    connection: Connection,
    task: JoinHandle<()>,
}

impl FragmentStream {
    /// Next fragment, or None once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<GraphFragment, StreamError>> {
        self.rx.recv().await
    }

    /// Detach from the source and tear down its connection.
    ///
    /// Safe to call repeatedly; already-queued fragments stay readable.
    pub fn cancel(&self) {
        teardown(&self.connection);
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Drop for FragmentStream {
    fn drop(&mut self) {
        teardown(&self.connection);
        self.task.abort();
    }
}
