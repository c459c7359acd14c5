//! Domain model (ids, events, fault reports).

pub mod event;
pub mod fault;
pub mod ids;

pub use self::event::{Event, EventKind, EventProc, EventResult, Message, RecvMsgEvent, event_proc};
pub use self::fault::FaultReport;
pub use self::ids::QueueId;
