//! Lifecycle state of a queue handle.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Queue lifecycle.
///
/// State transitions:
/// - Idle -> Running (`start_loop`)
/// - Running -> Draining (consumer dequeues the close signal)
/// - Draining -> Terminated (consumer returned, latch released)
/// - Running -> Faulted (callback panicked with fault capture disabled)
///
/// Terminated and Faulted are absorbing; a handle is not reusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    Idle,
    Running,
    Draining,
    Terminated,
    Faulted,
}

impl QueueState {
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueState::Terminated | QueueState::Faulted)
    }

    fn as_u8(self) -> u8 {
        match self {
            QueueState::Idle => 0,
            QueueState::Running => 1,
            QueueState::Draining => 2,
            QueueState::Terminated => 3,
            QueueState::Faulted => 4,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => QueueState::Idle,
            1 => QueueState::Running,
            2 => QueueState::Draining,
            3 => QueueState::Terminated,
            _ => QueueState::Faulted,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(QueueState::Idle.as_u8()))
    }

    pub(crate) fn get(&self) -> QueueState {
        QueueState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `next` unless the current state is terminal.
    pub(crate) fn advance(&self, next: QueueState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                if QueueState::from_u8(cur).is_terminal() {
                    None
                } else {
                    Some(next.as_u8())
                }
            });
    }
}
