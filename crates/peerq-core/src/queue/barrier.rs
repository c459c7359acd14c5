//! Fault barrier around a single callback invocation.
//!
//! Captured panics are recorded by a process-wide panic hook while the
//! panicking frame is still on the stack, so the report carries the stack of
//! the callback rather than the barrier's. The hook chains to the previously
//! installed one and only intercepts panics raised inside a capture scope;
//! those never reach the default stderr output.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{AssertUnwindSafe, PanicHookInfo};
use std::pin::Pin;
use std::sync::Once;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

use super::Callback;
use super::handle::Shared;
use super::lifecycle::QueueState;
use crate::domain::FaultReport;

/// Where a captured panic happened, recorded by the hook.
struct PanicSite {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    /// Depth of capture scopes entered on this thread.
    static CAPTURING: Cell<u32> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

fn install_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            let capturing = CAPTURING.try_with(|c| c.get() > 0).unwrap_or(false);
            if !capturing {
                previous(info);
                return;
            }
            let site = PanicSite {
                location: info.location().map(|l| l.to_string()),
                backtrace: Backtrace::force_capture().to_string(),
            };
            let _ = LAST_PANIC.try_with(|slot| *slot.borrow_mut() = Some(site));
        }));
    });
}

/// Marks the current thread as capturing for the duration of one poll.
struct CaptureScope;

impl CaptureScope {
    fn enter() -> Self {
        CAPTURING.with(|c| c.set(c.get() + 1));
        CaptureScope
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        let _ = CAPTURING.try_with(|c| c.set(c.get().saturating_sub(1)));
    }
}

struct CaughtPanic {
    payload: Box<dyn Any + Send>,
    site: Option<PanicSite>,
}

/// Polls a callback inside a capture scope.
///
/// The scope is entered per poll: an async callback may resume on another
/// worker thread, and the hook only looks at the thread that panics.
struct Captured {
    inner: BoxFuture<'static, ()>,
}

impl Future for Captured {
    type Output = Result<(), CaughtPanic>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _scope = CaptureScope::enter();
        match std::panic::catch_unwind(AssertUnwindSafe(|| this.inner.as_mut().poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(())) => Poll::Ready(Ok(())),
            Err(payload) => {
                let site = LAST_PANIC.with(|slot| slot.borrow_mut().take());
                Poll::Ready(Err(CaughtPanic { payload, site }))
            }
        }
    }
}

/// Runs `cb` and applies the queue's fault policy.
///
/// The capture flag is read once, before the callback starts. With capture
/// enabled a panic is reported to the diagnostic sink and swallowed. With
/// capture disabled the queue is marked faulted and the panic resumes,
/// taking the consumer task down with it.
pub(crate) async fn invoke(shared: &Shared, cb: Callback) {
    let capture = shared.capture_faults.load(Ordering::Relaxed);

    if capture {
        install_hook();
        match (Captured { inner: cb.into_future() }).await {
            Ok(()) => shared.counters.record_executed(),
            Err(caught) => {
                shared.counters.record_fault();
                // No site means another hook replaced ours after install.
                let (location, backtrace) = match caught.site {
                    Some(site) => (site.location, site.backtrace),
                    None => (None, Backtrace::force_capture().to_string()),
                };
                let report = FaultReport::from_panic(
                    shared.id,
                    shared.name.clone(),
                    caught.payload.as_ref(),
                    backtrace,
                )
                .with_location(location);
                shared.sink.report(&report);
            }
        }
        return;
    }

    // State a callback shares behind a Mutex may be left poisoned.
    match AssertUnwindSafe(cb.into_future()).catch_unwind().await {
        Ok(()) => shared.counters.record_executed(),
        Err(payload) => {
            shared.counters.record_fault();
            shared.lifecycle.advance(QueueState::Faulted);
            tracing::error!(queue = %shared.id, "callback panicked, event loop aborted");
            std::panic::resume_unwind(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn failing_step() {
        panic!("step failed");
    }

    #[tokio::test]
    async fn captured_panic_records_site_of_the_panic() {
        install_hook();
        let outcome = Captured {
            inner: Box::pin(async { failing_step() }),
        }
        .await;

        let Err(caught) = outcome else {
            panic!("expected the panic to be caught");
        };
        let site = caught.site.expect("hook records the panic site");
        assert!(site.location.unwrap().contains("barrier.rs"));
        assert!(site.backtrace.contains("failing_step"), "{}", site.backtrace);
        assert_eq!(CAPTURING.with(|c| c.get()), 0);
    }

    #[tokio::test]
    async fn completed_callback_leaves_no_site_behind() {
        install_hook();
        let outcome = Captured {
            inner: Box::pin(async {}),
        }
        .await;
        assert!(outcome.is_ok());
        assert!(LAST_PANIC.with(|slot| slot.borrow().is_none()));
    }
}
