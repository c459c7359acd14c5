use crate::domain::FaultReport;
use crate::ports::DiagnosticSink;

/// Writes fault reports as `tracing` errors, stack trace included.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&self, fault: &FaultReport) {
        tracing::error!(
            queue = %fault.queue,
            queue_name = fault.queue_name.as_deref().unwrap_or(""),
            panic = %fault.message,
            location = fault.location.as_deref().unwrap_or("unknown"),
            "callback panicked\n{}",
            fault.backtrace
        );
    }
}
