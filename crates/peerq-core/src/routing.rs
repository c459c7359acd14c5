//! Routing - session events onto the owning peer's queue
//!
//! Handlers are written as if they were called directly; [`proc_queue`]
//! decides by event kind whether the call is deferred onto a queue.

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::domain::{Event, EventKind, EventProc, EventResult};
use crate::error::QueueError;
use crate::ports::Session;
use crate::queue::{Callback, EventQueue};

/// Post `cb` to `queue`, or run it inline when there is no queue.
///
/// Inline runs happen on the caller's task, outside any fault barrier.
pub async fn queued_call(queue: Option<&EventQueue>, cb: Callback) -> Result<(), QueueError> {
    match queue {
        Some(queue) => queue.post_callback(Some(cb)).await,
        None => {
            cb.run().await;
            Ok(())
        }
    }
}

/// [`queued_call`] on the queue of the session's peer. No session, no call.
pub async fn session_queued_call(
    session: Option<&Arc<dyn Session>>,
    cb: Callback,
) -> Result<(), QueueError> {
    let Some(session) = session else {
        return Ok(());
    };
    let queue = session.peer().event_queue();
    queued_call(queue.as_ref(), cb).await
}

/// Wrap `user` so received messages are handled on the session's queue.
///
/// - `RecvMsg`: the call to `user` is posted to the session's queue and the
///   wrapper returns `None` right away. Whatever `user` returns for these
///   events is discarded.
/// - anything else: `user` is awaited in place and its result returned.
pub fn proc_queue(user: EventProc) -> EventProc {
    Arc::new(move |event: Event| -> BoxFuture<'static, EventResult> {
        let user = Arc::clone(&user);
        Box::pin(async move {
            if event.kind() != EventKind::RecvMsg {
                return user(event).await;
            }
            let session = event.session().cloned();

            let cb = Callback::from_future(async move {
                let _ = user(event).await;
            });
            if let Err(err) = session_queued_call(session.as_ref(), cb).await {
                tracing::warn!(
                    session = session.as_ref().map(|s| s.id()),
                    error = %err,
                    "dropping received message, session queue rejected it"
                );
            }
            None
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, RecvMsgEvent, event_proc};
    use crate::ports::Peer;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    const WINDOW: Duration = Duration::from_secs(5);

    struct TestPeer {
        queue: Option<EventQueue>,
    }

    impl Peer for TestPeer {
        fn name(&self) -> &str {
            "test-peer"
        }

        fn event_queue(&self) -> Option<EventQueue> {
            self.queue.clone()
        }
    }

    struct TestSession {
        id: u64,
        peer: Arc<TestPeer>,
    }

    impl Session for TestSession {
        fn id(&self) -> u64 {
            self.id
        }

        fn peer(&self) -> Arc<dyn Peer> {
            self.peer.clone()
        }
    }

    fn session_with(queue: Option<EventQueue>) -> Arc<dyn Session> {
        Arc::new(TestSession {
            id: 1,
            peer: Arc::new(TestPeer { queue }),
        })
    }

    /// Handler recording (kind, message text) of every call.
    fn recording_handler() -> (EventProc, Arc<Mutex<Vec<(EventKind, Option<String>)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let rec = calls.clone();
        let handler = event_proc(move |ev| {
            let rec = rec.clone();
            async move {
                let text = match &ev {
                    Event::RecvMsg(r) => r.msg.downcast_ref::<String>().cloned(),
                    _ => None,
                };
                rec.lock().unwrap().push((ev.kind(), text));
                Some(json!("handled"))
            }
        });
        (handler, calls)
    }

    #[tokio::test]
    async fn queued_call_without_queue_runs_inline() {
        let (tx, mut rx) = oneshot::channel();
        queued_call(None, Callback::new(move || tx.send(7).unwrap()))
            .await
            .unwrap();
        assert_eq!(rx.try_recv(), Ok(7));
    }

    #[tokio::test]
    async fn session_queued_call_without_session_is_noop() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        session_queued_call(None, Callback::new(move || flag.store(true, Ordering::SeqCst)))
            .await
            .unwrap();
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn non_message_events_pass_through() {
        let (user, calls) = recording_handler();
        let wrapped = proc_queue(user.clone());
        let queue = EventQueue::new();
        let session = session_with(Some(queue.clone()));

        let direct = user(Event::Connected { session: session.clone() }).await;
        let routed = wrapped(Event::Connected { session }).await;

        assert_eq!(routed, direct);
        assert_eq!(calls.lock().unwrap().len(), 2);
        // nothing went through the queue, it was never even started
        assert_eq!(queue.stats().posted, 0);
    }

    #[tokio::test]
    async fn received_message_runs_on_session_queue() {
        let queue = EventQueue::new();
        queue.start_loop().unwrap();

        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        queue
            .post_async(async move {
                let _ = gate_rx.await;
            })
            .await
            .unwrap();

        let (user, calls) = recording_handler();
        let wrapped = proc_queue(user);
        let session = session_with(Some(queue.clone()));

        let result = wrapped(Event::recv_msg(session, Message::new(String::from("ping")))).await;
        assert_eq!(result, None);
        assert!(calls.lock().unwrap().is_empty(), "handler ran before the blocker");

        gate_tx.send(()).unwrap();
        queue.stop_loop().await.unwrap();
        timeout(WINDOW, queue.wait()).await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![(EventKind::RecvMsg, Some("ping".to_string()))]
        );
    }

    #[tokio::test]
    async fn received_message_without_queue_runs_inline() {
        let (user, calls) = recording_handler();
        let wrapped = proc_queue(user);
        let session = session_with(None);

        let result = wrapped(Event::recv_msg(session, Message::new(String::from("inline")))).await;

        assert_eq!(result, None);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![(EventKind::RecvMsg, Some("inline".to_string()))]
        );
    }

    #[tokio::test]
    async fn received_message_without_session_is_dropped() {
        let (user, calls) = recording_handler();
        let wrapped = proc_queue(user);

        let ev = Event::RecvMsg(RecvMsgEvent {
            session: None,
            msg: Message::new(String::from("orphan")),
        });
        assert_eq!(wrapped(ev).await, None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_post_still_returns_neutral_result() {
        let queue = EventQueue::new();
        queue.start_loop().unwrap();
        queue.stop_loop().await.unwrap();
        timeout(WINDOW, queue.wait()).await.unwrap();

        let (user, calls) = recording_handler();
        let wrapped = proc_queue(user);
        let session = session_with(Some(queue));

        let result = wrapped(Event::recv_msg(session, Message::new(String::from("late")))).await;
        assert_eq!(result, None);
        assert!(calls.lock().unwrap().is_empty());
    }
}
