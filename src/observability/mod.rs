//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!       (connection_id, peer_addr, address, error)
//!     → logging.rs installs the fmt subscriber
//! ```
//!
//! # Design Decisions
//! - Structured logging via the tracing crate
//! - Connection ID flows through every per-connection event

pub mod logging;

pub use logging::init_logging;
