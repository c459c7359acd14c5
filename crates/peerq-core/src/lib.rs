//! peerq-core
//!
//! Single-consumer event queue used to serialize callbacks per peer.
//!
//! # モジュール構成
//! - **domain**: ids, event model, fault reports
//! - **ports**: 抽象化レイヤー（DiagnosticSink, Session, Peer）
//! - **impls**: ports の実装（TracingSink, MemorySink）
//! - **queue**: EventQueue handle, consumer loop, fault barrier
//! - **routing**: queued_call / session_queued_call / proc_queue
//! - **config**, **error**, **observability**

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod routing;

pub use config::{DEFAULT_QUEUE_SIZE, QueueConfig};
pub use domain::{Event, EventKind, EventProc, EventResult, FaultReport, Message, QueueId, RecvMsgEvent, event_proc};
pub use error::QueueError;
pub use observability::QueueStats;
pub use ports::{DiagnosticSink, Peer, Session};
pub use queue::{Callback, EventQueue, EventQueueBuilder, QueueState};
pub use routing::{proc_queue, queued_call, session_queued_call};
