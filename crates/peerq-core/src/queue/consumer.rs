//! Consumer loop: the single task draining a queue.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::Signal;
use super::barrier;
use super::handle::Shared;
use super::lifecycle::QueueState;

pub(crate) async fn run(shared: Arc<Shared>, mut rx: mpsc::Receiver<Signal>) {
    let mut guard = ExitGuard {
        shared: Arc::clone(&shared),
        finished: false,
    };
    tracing::debug!(queue = %shared.id, "event loop started");

    // recv() never yields None here: `shared` keeps a sender alive.
    while let Some(signal) = rx.recv().await {
        match signal {
            Signal::Work(cb) => barrier::invoke(&shared, cb).await,
            Signal::Close => {
                shared.lifecycle.advance(QueueState::Draining);
                break;
            }
        }
    }

    rx.close();
    guard.finished = true;
}

/// Releases the termination latch when the loop exits.
///
/// A panic that escapes the fault barrier has already marked the queue
/// faulted; the latch stays closed in that case. If the task is dropped
/// mid-loop (runtime shutdown) the latch is released so waiters can return.
struct ExitGuard {
    shared: Arc<Shared>,
    finished: bool,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let shared = &self.shared;
        if shared.lifecycle.get() == QueueState::Faulted {
            return;
        }
        if !self.finished {
            tracing::warn!(queue = %shared.id, "event loop cancelled before close signal");
        }
        shared.lifecycle.advance(QueueState::Terminated);
        shared.latch.send_replace(true);
        tracing::debug!(queue = %shared.id, "event loop exited");
    }
}
