//! Fault reports emitted by the fault barrier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;

use super::ids::QueueId;

/// A panic captured while running a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultReport {
    pub queue: QueueId,
    pub queue_name: Option<String>,
    pub message: String,
    /// `file:line:col` of the `panic!`, when the panic hook saw it.
    pub location: Option<String>,
    /// Stack of the panicking callback.
    pub backtrace: String,
    pub occurred_at: DateTime<Utc>,
}

impl FaultReport {
    pub fn new(
        queue: QueueId,
        queue_name: Option<String>,
        message: impl Into<String>,
        backtrace: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            queue_name,
            message: message.into(),
            location: None,
            backtrace: backtrace.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    /// Build a report from a payload caught by `catch_unwind`.
    pub fn from_panic(
        queue: QueueId,
        queue_name: Option<String>,
        payload: &(dyn Any + Send),
        backtrace: impl Into<String>,
    ) -> Self {
        Self::new(queue, queue_name, panic_message(payload), backtrace)
    }
}

/// Extracts the human readable part of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::static_str(Box::new("boom") as Box<dyn Any + Send>, "boom")]
    #[case::owned(Box::new(String::from("formatted 42")) as Box<dyn Any + Send>, "formatted 42")]
    #[case::other(Box::new(42_u32) as Box<dyn Any + Send>, "unknown panic")]
    fn panic_message_handles_payload_kinds(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
        assert_eq!(panic_message(payload.as_ref()), expected);
    }

    #[test]
    fn report_keeps_queue_identity() {
        let id = QueueId::generate();
        let payload: Box<dyn Any + Send> = Box::new("bad");
        let report = FaultReport::from_panic(id, Some("peer-a".into()), payload.as_ref(), "trace");
        assert_eq!(report.queue, id);
        assert_eq!(report.queue_name.as_deref(), Some("peer-a"));
        assert_eq!(report.message, "bad");
        assert_eq!(report.backtrace, "trace");
        assert_eq!(report.location, None);

        let report = report.with_location(Some("src/lib.rs:1:1".into()));
        assert_eq!(report.location.as_deref(), Some("src/lib.rs:1:1"));
    }
}
