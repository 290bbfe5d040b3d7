//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     stop() → trigger → acceptor closes listener → pool drains → done
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful stop
//!     SIGHUP → policy reload
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - Draining waits for in-flight connections; there is no forced deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{Signal, Signals};
