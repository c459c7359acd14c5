//! Queue module: handle, consumer loop, fault barrier, lifecycle.

mod barrier;
mod consumer;
mod handle;
mod lifecycle;

pub use handle::{EventQueue, EventQueueBuilder};
pub use lifecycle::QueueState;

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// A unit of work run on the consumer.
///
/// Closures are wrapped lazily: nothing runs until the consumer polls the
/// callback. Async callbacks may suspend; while one is suspended no other
/// callback on the same queue advances.
pub struct Callback(BoxFuture<'static, ()>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::pin(async move { f() }))
    }

    pub fn from_future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Box::pin(fut))
    }

    /// Run on the current task, outside any fault barrier.
    pub async fn run(self) {
        self.0.await
    }

    pub(crate) fn into_future(self) -> BoxFuture<'static, ()> {
        self.0
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Values carried by the channel. `Close` is the termination sentinel.
pub(crate) enum Signal {
    Work(Callback),
    Close,
}
