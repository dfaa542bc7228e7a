//! Mutation observation
//!
//! The frontend reports changes it sees under a rendered view (the embedded
//! frame loading its document, resizing, injecting children). Observers
//! subscribe per root node and receive batches over a channel; dropping the
//! receiver disconnects the observer.

use crate::dom::NodeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    /// Children added or removed
    ChildList,
    /// Attribute changed
    Attributes,
    /// Text changed
    CharacterData,
}

/// One observed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// What changed
    pub kind: MutationKind,
    /// Node the change happened on
    pub target: NodeId,
}

/// Changes delivered together
pub type MutationBatch = Vec<MutationRecord>;

/// Receiving end of an observation
pub type MutationReceiver = mpsc::UnboundedReceiver<MutationBatch>;

/// Source of subtree mutation batches
pub trait MutationSource: Send + Sync {
    /// Start observing all descendants of `root`
    ///
    /// Observation starts immediately; batches are buffered until read.
    fn observe(&self, root: NodeId) -> MutationReceiver;
}

/// In-process mutation source the frontend bridge feeds
#[derive(Debug, Default)]
pub struct MutationHub {
    observers: Mutex<HashMap<NodeId, Vec<mpsc::UnboundedSender<MutationBatch>>>>,
}

impl MutationHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a batch observed under `root`
    ///
    /// Returns the number of live observers that received it. Disconnected
    /// observers are pruned.
    pub fn dispatch(&self, root: NodeId, batch: MutationBatch) -> usize {
        let mut observers = self.observers.lock();
        let Some(senders) = observers.get_mut(&root) else {
            return 0;
        };

        senders.retain(|tx| tx.send(batch.clone()).is_ok());
        let delivered = senders.len();
        if senders.is_empty() {
            observers.remove(&root);
        }
        delivered
    }

    /// Number of connected observers for a root
    pub fn observer_count(&self, root: NodeId) -> usize {
        self.observers
            .lock()
            .get(&root)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl MutationSource for MutationHub {
    fn observe(&self, root: NodeId) -> MutationReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.lock().entry(root).or_default().push(tx);
        rx
    }
}
