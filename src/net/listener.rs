//! TCP acceptor that feeds the worker pool.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Hand each connection to the worker pool, closing it if rejected
//! - Graceful handling of accept errors
//!
//! # Design Decisions
//! - Bind failure is returned to the caller; the daemon treats it as fatal
//! - Accept errors are logged and the loop continues after a short pause
//! - Shutdown drops the listening socket; in-flight connections keep running

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::error::ServerError;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionSession;
use crate::net::handler::ConnectionHandler;
use crate::policy::PolicyStore;
use crate::pool::WorkerPool;

/// Pause after a failed accept. Errors such as EMFILE persist until a
/// connection closes, so retrying at once only spins.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Lifecycle of the acceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorState {
    /// Bound but not yet accepting.
    Idle,
    /// Accept loop running.
    Listening,
    /// Shutdown observed; no further accepts.
    Draining,
    /// Listening socket closed.
    Closed,
}

/// Owns the listening socket and the accept loop.
pub struct Acceptor {
    inner: TcpListener,
    local_addr: SocketAddr,
    state: watch::Sender<AcceptorState>,
}

impl Acceptor {
    /// Bind to `address` (e.g. `"0.0.0.0:843"`).
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.to_string(),
                source,
            })?;

        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "Listener bound");

        let (state, _) = watch::channel(AcceptorState::Idle);
        Ok(Self {
            inner: listener,
            local_addr,
            state,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Subscribe to state transitions.
    pub fn state(&self) -> watch::Receiver<AcceptorState> {
        self.state.subscribe()
    }

    /// Accept connections until `shutdown` fires, submitting each to `pool`.
    ///
    /// Every connection is served with the document that was active in
    /// `store` when it was accepted.
    pub async fn run(
        self,
        pool: WorkerPool,
        store: Arc<PolicyStore>,
        read_timeout: Option<Duration>,
        mut shutdown: ShutdownSignal,
    ) {
        self.state.send_replace(AcceptorState::Listening);
        tracing::info!(address = %self.local_addr, "Accepting connections");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = self.inner.accept() => match accepted {
                    Ok((stream, peer)) => dispatch(stream, peer, &pool, &store, read_timeout),
                    Err(e) => {
                        tracing::error!(error = %e, "Socket accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        self.state.send_replace(AcceptorState::Draining);
        tracing::info!(address = %self.local_addr, "Acceptor draining");

        drop(self.inner);
        self.state.send_replace(AcceptorState::Closed);
        tracing::info!(address = %self.local_addr, "Listening socket closed");
    }
}

fn dispatch(
    stream: TcpStream,
    peer: SocketAddr,
    pool: &WorkerPool,
    store: &PolicyStore,
    read_timeout: Option<Duration>,
) {
    let session = ConnectionSession::new(stream, peer);
    let id = session.id();
    tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection accepted");

    let handler = ConnectionHandler::new(store.current(), read_timeout);
    // A rejected job is dropped with its session, which closes the socket.
    if let Err(e) = pool.submit(async move {
        handler.handle(session).await;
    }) {
        tracing::warn!(
            connection_id = %id,
            peer_addr = %peer,
            error = %e,
            "Executor rejected connection, closed client"
        );
    }
}
