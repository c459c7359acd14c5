//! Ports - 抽象化レイヤー
//!
//! The queue depends on two things it does not own: somewhere to write
//! diagnostics, and the session/peer graph the routing adapter walks.

pub mod diagnostic;
pub mod session;

pub use self::diagnostic::DiagnosticSink;
pub use self::session::{Peer, Session};
