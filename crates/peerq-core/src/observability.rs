use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::QueueId;
use crate::queue::QueueState;

/// Point-in-time view of one queue.
///
/// Counters are read with relaxed ordering, so a snapshot taken while the
/// loop is running may be slightly behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub id: QueueId,
    pub name: Option<String>,
    pub state: QueueState,
    pub capacity: usize,
    /// Slots currently occupied in the channel.
    pub pending: usize,
    pub posted: u64,
    pub executed: u64,
    pub faults: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    posted: AtomicU64,
    executed: AtomicU64,
    faults: AtomicU64,
}

impl Counters {
    pub(crate) fn record_posted(&self) {
        self.posted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }

    pub(crate) fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub(crate) fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}
