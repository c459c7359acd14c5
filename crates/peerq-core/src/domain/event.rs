//! Session events and the handler type that consumes them.
//!
//! The queue only cares about one shape here: a received message carries the
//! session it arrived on. Every other variant is passed straight through by
//! [`proc_queue`](crate::routing::proc_queue).

use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::ports::{Peer, Session};

/// Opaque message payload.
#[derive(Clone)]
pub struct Message(Arc<dyn Any + Send + Sync>);

impl Message {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Message(..)")
    }
}

/// A message received on a session.
#[derive(Clone)]
pub struct RecvMsgEvent {
    /// `None` when the transport has already dropped the session.
    pub session: Option<Arc<dyn Session>>,
    pub msg: Message,
}

impl RecvMsgEvent {
    pub fn new(session: Arc<dyn Session>, msg: Message) -> Self {
        Self {
            session: Some(session),
            msg,
        }
    }
}

impl fmt::Debug for RecvMsgEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecvMsgEvent")
            .field("session", &self.session.as_ref().map(|s| s.id()))
            .field("msg", &self.msg)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Accepted,
    Connected,
    ConnectError,
    Closed,
    RecvMsg,
}

/// Events produced by the networking layer.
#[derive(Clone)]
pub enum Event {
    Accepted { session: Arc<dyn Session> },
    Connected { session: Arc<dyn Session> },
    ConnectError { peer: Arc<dyn Peer>, reason: String },
    Closed { session: Arc<dyn Session>, reason: String },
    RecvMsg(RecvMsgEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Accepted { .. } => EventKind::Accepted,
            Event::Connected { .. } => EventKind::Connected,
            Event::ConnectError { .. } => EventKind::ConnectError,
            Event::Closed { .. } => EventKind::Closed,
            Event::RecvMsg(_) => EventKind::RecvMsg,
        }
    }

    /// Session the event belongs to, if any.
    pub fn session(&self) -> Option<&Arc<dyn Session>> {
        match self {
            Event::Accepted { session }
            | Event::Connected { session }
            | Event::Closed { session, .. } => Some(session),
            Event::RecvMsg(ev) => ev.session.as_ref(),
            Event::ConnectError { .. } => None,
        }
    }

    pub fn recv_msg(session: Arc<dyn Session>, msg: Message) -> Self {
        Event::RecvMsg(RecvMsgEvent::new(session, msg))
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::RecvMsg(ev) => fmt::Debug::fmt(ev, f),
            Event::ConnectError { peer, reason } => f
                .debug_struct("ConnectError")
                .field("peer", &peer.name())
                .field("reason", reason)
                .finish(),
            other => f
                .debug_struct("Event")
                .field("kind", &other.kind())
                .field("session", &other.session().map(|s| s.id()))
                .finish(),
        }
    }
}

/// Handler result. `None` is the neutral "nothing to reply" value.
pub type EventResult = Option<serde_json::Value>;

/// Event handler: `(Event) -> EventResult`.
pub type EventProc = Arc<dyn Fn(Event) -> BoxFuture<'static, EventResult> + Send + Sync>;

/// Wraps an async closure as an [`EventProc`].
///
/// ```ignore
/// let handler = event_proc(|ev| async move {
///     println!("{:?}", ev.kind());
///     None
/// });
/// ```
pub fn event_proc<F, Fut>(f: F) -> EventProc
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EventResult> + Send + 'static,
{
    Arc::new(move |ev: Event| -> BoxFuture<'static, EventResult> { Box::pin(f(ev)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;

    struct TestPeer;

    impl Peer for TestPeer {
        fn name(&self) -> &str {
            "test-peer"
        }

        fn event_queue(&self) -> Option<EventQueue> {
            None
        }
    }

    struct TestSession;

    impl Session for TestSession {
        fn id(&self) -> u64 {
            7
        }

        fn peer(&self) -> Arc<dyn Peer> {
            Arc::new(TestPeer)
        }
    }

    #[test]
    fn message_downcasts_to_original_type() {
        let msg = Message::new(String::from("hello"));
        assert!(msg.is::<String>());
        assert_eq!(msg.downcast_ref::<String>().map(String::as_str), Some("hello"));
        assert!(msg.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn kind_and_session_accessors() {
        let session: Arc<dyn Session> = Arc::new(TestSession);
        let ev = Event::recv_msg(session.clone(), Message::new(1_u8));
        assert_eq!(ev.kind(), EventKind::RecvMsg);
        assert_eq!(ev.session().map(|s| s.id()), Some(7));

        let ev = Event::ConnectError {
            peer: Arc::new(TestPeer),
            reason: "refused".into(),
        };
        assert_eq!(ev.kind(), EventKind::ConnectError);
        assert!(ev.session().is_none());
        assert!(format!("{ev:?}").contains("test-peer"));
    }

    #[tokio::test]
    async fn event_proc_wraps_async_closure() {
        let handler = event_proc(|ev| async move { Some(serde_json::json!(format!("{:?}", ev.kind()))) });
        let ev = Event::Connected {
            session: Arc::new(TestSession),
        };
        assert_eq!(handler(ev).await, Some(serde_json::json!("Connected")));
    }
}
