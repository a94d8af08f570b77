//! Live Monitor
//!
//! Holds the most recently applied [`LiveView`] and rebuilds it on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::monitor::aggregator::{LiveAggregator, LiveView};

/// Cloneable handle to the shared live view.
///
/// Recomputes may overlap (a change notification and a manual refresh, say).
/// Each recompute takes a sequence number when it starts, and a result is
/// applied only if nothing newer has been applied already.
#[derive(Clone)]
pub struct LiveMonitor {
    aggregator: Arc<LiveAggregator>,
    view: Arc<RwLock<Option<LiveView>>>,
    next_sequence: Arc<AtomicU64>,
}

impl LiveMonitor {
    pub fn new(aggregator: LiveAggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            view: Arc::new(RwLock::new(None)),
            next_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    // == Refresh ==
    /// Rebuilds the view from scratch and returns the view now in effect.
    ///
    /// If a newer recompute finished first, this result is dropped and the
    /// newer view is returned instead.
    pub async fn refresh(&self) -> LiveView {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut view = self.aggregator.fetch_and_join().await;
        view.sequence = sequence;

        let mut current = self.view.write().await;
        match current.as_ref() {
            Some(applied) if applied.sequence > sequence => {
                debug!(stale = sequence, applied = applied.sequence, "discarding stale live view");
                applied.clone()
            }
            _ => {
                *current = Some(view.clone());
                view
            }
        }
    }

    // == Current ==
    /// The applied view, building the first one if none exists yet.
    pub async fn current(&self) -> LiveView {
        if let Some(view) = self.view.read().await.as_ref() {
            return view.clone();
        }
        self.refresh().await
    }

    /// Sequence number of the applied view, if any.
    pub async fn applied_sequence(&self) -> Option<u64> {
        self.view.read().await.as_ref().map(|view| view.sequence)
    }
}
