//! Ready detection by mutation quiescence
//!
//! An embedded frame gives no reliable "loaded" signal, so a view counts as
//! ready once its subtree has stopped changing: every mutation batch restarts
//! a quiet-period timer, and the wait completes when the timer runs out.

use crate::dom::NodeId;
use crate::mutations::{MutationReceiver, MutationSource};
use embed_core::DEFAULT_READY_DELAY_MS;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Debounced "subtree has settled" detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiescenceDetector {
    quiet_period: Duration,
}

impl Default for QuiescenceDetector {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_READY_DELAY_MS))
    }
}

impl QuiescenceDetector {
    /// Create a detector with a custom quiet period
    pub fn new(quiet_period: Duration) -> Self {
        Self { quiet_period }
    }

    /// Quiet period
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Start observing `root` now and return a future for its quiescence
    ///
    /// Observation begins before this returns, so mutations that happen
    /// before the future is first polled still count.
    pub fn watch(
        &self,
        source: &dyn MutationSource,
        root: NodeId,
    ) -> impl Future<Output = ()> + Send + 'static {
        let mutations = source.observe(root);
        let detector = *self;
        async move { detector.wait(mutations).await }
    }

    /// Resolve once a full quiet period passes after a mutation batch
    ///
    /// Never resolves if no batch ever arrives. The receiver is dropped on
    /// completion, which disconnects the observer.
    pub async fn wait(self, mut mutations: MutationReceiver) {
        if mutations.recv().await.is_none() {
            std::future::pending::<()>().await;
        }

        let mut deadline = Instant::now() + self.quiet_period;
        let mut open = true;
        loop {
            tokio::select! {
                batch = mutations.recv(), if open => match batch {
                    Some(_) => deadline = Instant::now() + self.quiet_period,
                    None => open = false,
                },
                _ = sleep_until(deadline) => break,
            }
        }

        drop(mutations);
        tracing::debug!("Subtree quiet for {:?}", self.quiet_period);
    }
}
