//! Per-connection identity and session state.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Carry the accepted stream and peer address to a worker
//! - Own the fixed-size read buffer for the connection's lifetime

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::net::protocol::READ_BUFFER_SIZE;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Transient state for one accepted socket.
///
/// Created when a connection is accepted and consumed by the handler; the
/// stream is closed when the session is dropped.
pub struct ConnectionSession<S> {
    id: ConnectionId,
    peer: SocketAddr,
    stream: S,
    buffer: Box<[u8; READ_BUFFER_SIZE]>,
}

impl<S> ConnectionSession<S> {
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer,
            stream,
            buffer: Box::new([0; READ_BUFFER_SIZE]),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Split into the stream and the read buffer.
    pub fn into_parts(self) -> (S, Box<[u8; READ_BUFFER_SIZE]>) {
        (self.stream, self.buffer)
    }
}

impl<S> std::fmt::Debug for ConnectionSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string(), format!("conn-{}", id.as_u64()));
    }

    #[test]
    fn session_carries_peer_and_buffer() {
        let peer: SocketAddr = "192.0.2.7:50123".parse().unwrap();
        let session = ConnectionSession::new((), peer);
        assert_eq!(session.peer(), peer);

        let ((), buffer) = session.into_parts();
        assert_eq!(buffer.len(), 1024);
    }
}
