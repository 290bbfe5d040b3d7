//! Per-connection protocol handling.
//!
//! # Responsibilities
//! - Read client input in chunks of up to 1024 bytes
//! - Answer the policy request with the policy document
//! - Echo any other input back unchanged
//! - Close both directions on every exit path
//!
//! # Design Decisions
//! - I/O errors end the connection and are logged, never propagated
//! - A failed policy write is logged and reading continues
//! - The document is an `Arc` snapshot taken at accept time

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::net::connection::ConnectionSession;
use crate::net::protocol::{classify, Message};
use crate::policy::PolicyDocument;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed its side (read returned 0).
    PeerClosed,
    /// A read failed.
    ReadError,
    /// Echoing input back failed.
    WriteError,
    /// No input arrived within the configured read timeout.
    TimedOut,
}

/// Counters reported when a session finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub policies_sent: usize,
    pub bytes_echoed: usize,
    pub end: SessionEnd,
}

/// Runs the policy protocol on one connection. Used once, then dropped.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    document: Arc<PolicyDocument>,
    read_timeout: Option<Duration>,
}

impl ConnectionHandler {
    pub fn new(document: Arc<PolicyDocument>, read_timeout: Option<Duration>) -> Self {
        Self {
            document,
            read_timeout,
        }
    }

    /// Serve `session` until the peer closes, an I/O error occurs, or a read
    /// times out.
    pub async fn handle<S>(self, session: ConnectionSession<S>) -> SessionStats
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = session.id();
        let peer = session.peer();
        let (stream, mut buffer) = session.into_parts();
        let (mut reader, mut writer) = tokio::io::split(stream);

        let mut policies_sent = 0;
        let mut bytes_echoed = 0;

        let end = loop {
            let read = match self.read_timeout {
                Some(limit) => match tokio::time::timeout(limit, reader.read(&mut buffer[..])).await {
                    Ok(read) => read,
                    Err(_) => {
                        tracing::warn!(
                            connection_id = %id,
                            peer_addr = %peer,
                            timeout_secs = limit.as_secs(),
                            "Socket read timed out"
                        );
                        break SessionEnd::TimedOut;
                    }
                },
                None => reader.read(&mut buffer[..]).await,
            };

            let count = match read {
                Ok(0) => break SessionEnd::PeerClosed,
                Ok(count) => count,
                Err(e) => {
                    tracing::error!(connection_id = %id, peer_addr = %peer, error = %e, "Socket read failed");
                    break SessionEnd::ReadError;
                }
            };

            match classify(&buffer[..count]) {
                Message::PolicyRequest => match writer.write_all(self.document.as_bytes()).await {
                    Ok(()) => {
                        policies_sent += 1;
                        tracing::info!(connection_id = %id, peer_addr = %peer, "Sent policy");
                    }
                    Err(e) => {
                        tracing::error!(
                            connection_id = %id,
                            peer_addr = %peer,
                            error = %e,
                            "Error sending policy file"
                        );
                    }
                },
                Message::Unrecognized(bytes) => {
                    if let Err(e) = writer.write_all(bytes).await {
                        tracing::error!(connection_id = %id, peer_addr = %peer, error = %e, "Socket write failed");
                        break SessionEnd::WriteError;
                    }
                    bytes_echoed += bytes.len();
                    tracing::info!(
                        connection_id = %id,
                        peer_addr = %peer,
                        bytes = bytes.len(),
                        "Ignoring request"
                    );
                    tracing::debug!(
                        connection_id = %id,
                        received = %String::from_utf8_lossy(bytes),
                        "Received wrong request text"
                    );
                }
            }
        };

        if let Err(e) = writer.flush().await {
            tracing::error!(connection_id = %id, error = %e, "Error flushing output stream");
        }
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(connection_id = %id, error = %e, "Error closing output stream");
        }
        tracing::trace!(connection_id = %id, "Flushed and closed output stream");
        drop(writer);
        drop(reader);

        let stats = SessionStats {
            policies_sent,
            bytes_echoed,
            end,
        };
        tracing::debug!(
            connection_id = %id,
            peer_addr = %peer,
            policies_sent,
            bytes_echoed,
            end = ?end,
            "Connection closed"
        );
        stats
    }
}
