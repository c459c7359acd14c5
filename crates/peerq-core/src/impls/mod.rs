//! Impls - ports の実装
//!
//! - **TracingSink**: default DiagnosticSink, writes through `tracing`
//! - **MemorySink**: keeps reports in memory (tests, demos)

pub mod memory_sink;
pub mod tracing_sink;

pub use self::memory_sink::MemorySink;
pub use self::tracing_sink::TracingSink;
