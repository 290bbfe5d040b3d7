//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → connection.rs (session: id, peer, read buffer)
//!     → worker pool
//!     → handler.rs (read, classify via protocol.rs, respond)
//!
//! Acceptor States:
//!     Idle → Listening → Draining → Closed
//! ```
//!
//! # Design Decisions
//! - Each connection is independent; no state survives between connections
//! - A saturated or stopped pool closes the connection instead of blocking accept

pub mod connection;
pub mod handler;
pub mod listener;
pub mod protocol;

pub use connection::{ConnectionId, ConnectionSession};
pub use handler::{ConnectionHandler, SessionEnd, SessionStats};
pub use listener::{Acceptor, AcceptorState};
pub use protocol::{EXPECTED_REQUEST, READ_BUFFER_SIZE};
