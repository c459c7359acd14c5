use thiserror::Error;

/// Errors returned by [`EventQueue`](crate::EventQueue) operations.
///
/// Callback outcomes never show up here: posting is fire-and-forget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("event queue is closed")]
    Closed,

    #[error("event loop already started")]
    AlreadyStarted,

    #[error("event loop already stopped")]
    AlreadyStopped,

    #[error("start_loop must be called from within a tokio runtime")]
    NoRuntime,
}
