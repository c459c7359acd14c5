use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use peerq_core::impls::MemorySink;
use peerq_core::{
    Event, EventQueue, EventResult, Message, Peer, QueueError, Session, event_proc, proc_queue,
};
use tracing_subscriber::EnvFilter;

struct DemoPeer {
    name: String,
    queue: Option<EventQueue>,
}

impl Peer for DemoPeer {
    fn name(&self) -> &str {
        &self.name
    }

    fn event_queue(&self) -> Option<EventQueue> {
        self.queue.clone()
    }
}

struct DemoSession {
    id: u64,
    peer: Arc<DemoPeer>,
}

impl Session for DemoSession {
    fn id(&self) -> u64 {
        self.id
    }

    fn peer(&self) -> Arc<dyn Peer> {
        self.peer.clone()
    }
}

/// アプリ側のハンドラ：キューの存在を知らない
async fn on_event(ev: Event, handled: Arc<AtomicU64>) -> EventResult {
    let session = ev.session().map(|s| s.id());
    match &ev {
        Event::RecvMsg(recv) => {
            let text = recv.msg.downcast_ref::<String>().cloned().unwrap_or_default();
            if text == "boom" {
                panic!("handler failed on session {session:?}");
            }
            tracing::info!(?session, %text, "message");
        }
        other => tracing::info!(?session, kind = ?other.kind(), "session event"),
    }
    handled.fetch_add(1, Ordering::Relaxed);
    None
}

#[tokio::main]
async fn main() -> Result<(), QueueError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) peer ごとにキューを用意（片方はキューなし = インライン実行）
    let sink = Arc::new(MemorySink::new());
    let queue = EventQueue::builder()
        .name("peer-a")
        .capture_faults(true)
        .sink(sink.clone())
        .build();
    let queued_peer = Arc::new(DemoPeer {
        name: "peer-a".into(),
        queue: Some(queue.clone()),
    });
    let inline_peer = Arc::new(DemoPeer {
        name: "peer-b".into(),
        queue: None,
    });

    // (B) 消費ループを起動
    queue.start_loop()?;

    // (C) ハンドラを proc_queue で包む
    let handled = Arc::new(AtomicU64::new(0));
    let handler = {
        let handled = handled.clone();
        proc_queue(event_proc(move |ev| on_event(ev, handled.clone())))
    };

    // (D) イベント投入
    let sessions: Vec<Arc<dyn Session>> = vec![
        Arc::new(DemoSession { id: 1, peer: queued_peer.clone() }),
        Arc::new(DemoSession { id: 2, peer: queued_peer }),
        Arc::new(DemoSession { id: 3, peer: inline_peer }),
    ];
    for session in &sessions {
        handler(Event::Connected { session: session.clone() }).await;
        for text in ["hello", "world"] {
            handler(Event::recv_msg(session.clone(), Message::new(text.to_string()))).await;
        }
    }
    handler(Event::recv_msg(sessions[0].clone(), Message::new("boom".to_string()))).await;
    for session in &sessions {
        handler(Event::Closed {
            session: session.clone(),
            reason: "demo finished".into(),
        })
        .await;
    }

    // (E) 停止して消費側の終了を待つ
    queue.stop_loop().await?;
    queue.wait().await;

    tracing::info!(
        handled = handled.load(Ordering::Relaxed),
        faults = sink.len(),
        "done"
    );
    match serde_json::to_string_pretty(&queue.stats()) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "stats encode failed"),
    }
    Ok(())
}
