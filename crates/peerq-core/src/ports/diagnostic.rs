//! DiagnosticSink port - fault barrier の出力先

use crate::domain::FaultReport;

/// Receives reports for panics swallowed by the fault barrier.
///
/// Called on the consumer task, so implementations should return quickly.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, fault: &FaultReport);
}
