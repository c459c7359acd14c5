//! EventQueue handle.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{RwLock, mpsc, watch};

use super::consumer;
use super::lifecycle::{Lifecycle, QueueState};
use super::{Callback, Signal};
use crate::config::QueueConfig;
use crate::domain::QueueId;
use crate::error::QueueError;
use crate::impls::TracingSink;
use crate::observability::{Counters, QueueStats};
use crate::ports::DiagnosticSink;

pub(crate) struct Shared {
    pub(crate) id: QueueId,
    pub(crate) name: Option<String>,
    capacity: usize,
    tx: mpsc::Sender<Signal>,
    /// Taken by `start_loop`; `None` afterwards.
    rx: Mutex<Option<mpsc::Receiver<Signal>>>,
    /// `true` once the close signal has been enqueued.
    ///
    /// Producers hold a read guard across their send so nothing can land
    /// behind the close signal.
    stopped: RwLock<bool>,
    pub(crate) capture_faults: AtomicBool,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) latch: watch::Sender<bool>,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
    pub(crate) counters: Counters,
}

/// Single-consumer event queue.
///
/// Producers post callbacks from any task or thread; one consumer task runs
/// them strictly in the order they were accepted. Cloning the handle is
/// cheap and every clone refers to the same queue.
///
/// # Lifecycle
/// ```ignore
/// let queue = EventQueue::new();
/// queue.start_loop()?;
/// queue.post(|| println!("on the consumer")).await?;
/// queue.stop_loop().await?;
/// queue.wait().await;
/// ```
///
/// # Hazards
/// - A callback that never returns blocks shutdown for good.
/// - A callback must not post to its own queue when the channel may be full.
/// - `stop_loop` on a queue that was never started blocks once the channel
///   is full, and `wait` never returns.
/// - With fault capture disabled a panicking callback aborts the consumer;
///   later posts fail with [`QueueError::Closed`] and `wait` never returns.
#[derive(Clone)]
pub struct EventQueue {
    shared: Arc<Shared>,
}

impl EventQueue {
    /// Idle queue with the default capacity.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        EventQueueBuilder::from_config(config).build()
    }

    pub fn builder() -> EventQueueBuilder {
        EventQueueBuilder::new()
    }

    pub fn id(&self) -> QueueId {
        self.shared.id
    }

    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn state(&self) -> QueueState {
        self.shared.lifecycle.get()
    }

    /// Set the fault regime; applies to callbacks started after this call.
    pub fn enable_capture_faults(&self, enabled: bool) {
        self.shared.capture_faults.store(enabled, Ordering::Relaxed);
    }

    pub fn capture_faults(&self) -> bool {
        self.shared.capture_faults.load(Ordering::Relaxed)
    }

    /// Enqueue a callback. `None` is ignored and never reaches the channel.
    ///
    /// Waits while the channel is full.
    pub async fn post_callback(&self, cb: Option<Callback>) -> Result<(), QueueError> {
        let Some(cb) = cb else {
            return Ok(());
        };

        let stopped = self.shared.stopped.read().await;
        if *stopped {
            return Err(QueueError::Closed);
        }
        self.shared
            .tx
            .send(Signal::Work(cb))
            .await
            .map_err(|_| QueueError::Closed)?;
        self.shared.counters.record_posted();
        Ok(())
    }

    pub async fn post<F>(&self, f: F) -> Result<(), QueueError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_callback(Some(Callback::new(f))).await
    }

    pub async fn post_async<Fut>(&self, fut: Fut) -> Result<(), QueueError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.post_callback(Some(Callback::from_future(fut))).await
    }

    /// Blocking variant of [`post`](Self::post) for producer threads that
    /// live outside the async runtime.
    ///
    /// # Panics
    /// Panics when called from within an async execution context.
    pub fn blocking_post<F>(&self, f: F) -> Result<(), QueueError>
    where
        F: FnOnce() + Send + 'static,
    {
        let stopped = self.shared.stopped.blocking_read();
        if *stopped {
            return Err(QueueError::Closed);
        }
        self.shared
            .tx
            .blocking_send(Signal::Work(Callback::new(f)))
            .map_err(|_| QueueError::Closed)?;
        self.shared.counters.record_posted();
        Ok(())
    }

    /// Spawn the consumer task on the current tokio runtime.
    pub fn start_loop(&self) -> Result<(), QueueError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        let rx = self
            .shared
            .rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or(QueueError::AlreadyStarted)?;

        self.shared.lifecycle.advance(QueueState::Running);
        runtime.spawn(consumer::run(Arc::clone(&self.shared), rx));
        Ok(())
    }

    /// Enqueue the close signal.
    ///
    /// Everything accepted before this call still runs; posts made after it
    /// fail with [`QueueError::Closed`].
    pub async fn stop_loop(&self) -> Result<(), QueueError> {
        let mut stopped = self.shared.stopped.write().await;
        if *stopped {
            return Err(QueueError::AlreadyStopped);
        }
        *stopped = true;
        self.shared
            .tx
            .send(Signal::Close)
            .await
            .map_err(|_| QueueError::Closed)
    }

    /// # Panics
    /// Panics when called from within an async execution context.
    pub fn blocking_stop_loop(&self) -> Result<(), QueueError> {
        let mut stopped = self.shared.stopped.blocking_write();
        if *stopped {
            return Err(QueueError::AlreadyStopped);
        }
        *stopped = true;
        self.shared
            .tx
            .blocking_send(Signal::Close)
            .map_err(|_| QueueError::Closed)
    }

    /// Wait until the consumer has exited. Any number of callers may wait.
    pub async fn wait(&self) {
        let mut latch = self.shared.latch.subscribe();
        // Only fails if the sender is dropped, and `self` keeps it alive.
        let _ = latch.wait_for(|released| *released).await;
    }

    pub fn stats(&self) -> QueueStats {
        let shared = &self.shared;
        QueueStats {
            id: shared.id,
            name: shared.name.clone(),
            state: shared.lifecycle.get(),
            capacity: shared.capacity,
            pending: shared.capacity.saturating_sub(shared.tx.capacity()),
            posted: shared.counters.posted(),
            executed: shared.counters.executed(),
            faults: shared.counters.faults(),
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}

/// Builds an [`EventQueue`].
///
/// # 使用例
/// ```ignore
/// let queue = EventQueue::builder()
///     .capacity(16)
///     .capture_faults(true)
///     .sink(Arc::new(MemorySink::new()))
///     .build();
/// ```
pub struct EventQueueBuilder {
    config: QueueConfig,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl EventQueueBuilder {
    pub fn new() -> Self {
        Self::from_config(QueueConfig::default())
    }

    pub fn from_config(config: QueueConfig) -> Self {
        Self { config, sink: None }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn capture_faults(mut self, enabled: bool) -> Self {
        self.config.capture_faults = enabled;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Where captured faults go. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> EventQueue {
        let capacity = self.config.effective_capacity();
        let (tx, rx) = mpsc::channel(capacity);
        let (latch, _) = watch::channel(false);
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink::new()));

        EventQueue {
            shared: Arc::new(Shared {
                id: QueueId::generate(),
                name: self.config.name,
                capacity,
                tx,
                rx: Mutex::new(Some(rx)),
                stopped: RwLock::new(false),
                capture_faults: AtomicBool::new(self.config.capture_faults),
                lifecycle: Lifecycle::new(),
                latch,
                sink,
                counters: Counters::default(),
            }),
        }
    }
}

impl Default for EventQueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}
