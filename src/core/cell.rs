//! Shared state cell - single-writer, multi-reader publish point
//!
//! Holds the most recently published fragment and broadcasts each publish
//! to every current subscriber. Late subscribers only see subsequent
//! publishes; there is no replay. The cell has no notion of "no listeners",
//! so cancelling the last subscriber never touches the upstream connection.

use super::model::GraphFragment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// How the cell republishes incoming fragments.
///
/// The pipeline delivers incremental deltas; whether the cell or the sink
/// accumulates them into the full chart is an explicit configuration, not
/// an implicit contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMode {
    /// Forward each fragment as-is; sinks accumulate themselves
    Incremental,
    /// Merge each fragment into a running aggregate and publish that,
    /// so any single received value redraws the whole chart
    Accumulate,
}

impl Default for PublishMode {
    fn default() -> Self {
        Self::Incremental
    }
}

struct CellInner {
    mode: PublishMode,
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<GraphFragment>>>,
    latest: Mutex<Option<GraphFragment>>,
    aggregate: Mutex<GraphFragment>,
    next_id: AtomicU64,
}

/// Broadcast cell for the latest aggregated graph
#[derive(Clone)]
pub struct SharedStateCell {
    inner: Arc<CellInner>,
}

impl SharedStateCell {
    pub fn new(mode: PublishMode) -> Self {
        Self {
            inner: Arc::new(CellInner {
                mode,
                subscribers: Mutex::new(HashMap::new()),
                latest: Mutex::new(None),
                aggregate: Mutex::new(GraphFragment::default()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn mode(&self) -> PublishMode {
        self.inner.mode
    }

    /// Store the fragment as latest and notify every current subscriber.
    ///
    /// Each subscriber registered before the call is notified exactly
    /// once; notification order across subscribers is not a contract.
    /// Never fails.
    pub fn publish(&self, fragment: GraphFragment) {
        let value = match self.inner.mode {
            PublishMode::Incremental => fragment,
            PublishMode::Accumulate => {
                let mut aggregate = self.inner.aggregate.lock().unwrap();
                aggregate.merge(fragment);
                aggregate.clone()
            }
        };

        *self.inner.latest.lock().unwrap() = Some(value.clone());

        let subscribers = self.inner.subscribers.lock().unwrap();
        log::debug!(
            "publishing {} tasks / {} links to {} subscribers",
            value.tasks.len(),
            value.links.len(),
            subscribers.len()
        );
        for tx in subscribers.values() {
            // a subscriber that dropped its receiver just misses out
            let _ = tx.send(value.clone());
        }
    }

    /// Register an observer for every publish from this moment on.
    pub fn subscribe(&self) -> (SubscriptionHandle, mpsc::UnboundedReceiver<GraphFragment>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().unwrap().insert(id, tx);
        (
            SubscriptionHandle {
                id,
                inner: self.inner.clone(),
                cancelled: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Clone of the last published value, if any.
    ///
    /// Interval-driven consumers poll this instead of subscribing; that
    /// keeps timer-based re-delivery out of the ingestion path.
    pub fn latest(&self) -> Option<GraphFragment> {
        self.inner.latest.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().unwrap().len()
    }
}

/// Caller-held token for one registered observer
pub struct SubscriptionHandle {
    id: u64,
    inner: Arc<CellInner>,
    cancelled: AtomicBool,
}

impl SubscriptionHandle {
    /// Deregister the observer. Calling this again is a no-op.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.subscribers.lock().unwrap().remove(&self.id);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
