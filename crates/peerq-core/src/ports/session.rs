//! Session / Peer port - owned by the networking layer
//!
//! The chain session -> peer -> queue is an access path, not ownership: the
//! peer owns its queue and sessions only point back at the peer. The queue
//! never reaches back into either.

use std::sync::Arc;

use crate::queue::EventQueue;

pub trait Peer: Send + Sync {
    fn name(&self) -> &str;

    /// Queue that serializes this peer's callbacks.
    ///
    /// `None` means no serialization: routed callbacks run inline.
    fn event_queue(&self) -> Option<EventQueue>;
}

pub trait Session: Send + Sync {
    fn id(&self) -> u64;

    fn peer(&self) -> Arc<dyn Peer>;
}
