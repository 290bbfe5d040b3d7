//! Startup and shutdown orchestration.
//!
//! # Responsibilities
//! - Load the policy document before any connection is accepted
//! - Size the worker pool from configuration
//! - Bind the acceptor and run it on its own task
//! - Stop: close the listener, then drain the pool
//!
//! # Design Decisions
//! - Fail fast: a bind failure is returned from `start`
//! - Subsystems initialize in order; the listener starts last

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lifecycle::Shutdown;
use crate::net::{Acceptor, AcceptorState};
use crate::policy::{PolicyDocument, PolicyStore};
use crate::pool::WorkerPool;

/// A running socket policy server.
pub struct Server {
    config: ServerConfig,
    local_addr: SocketAddr,
    store: Arc<PolicyStore>,
    pool: WorkerPool,
    shutdown: Shutdown,
    acceptor_state: watch::Receiver<AcceptorState>,
    acceptor: JoinHandle<()>,
}

impl Server {
    /// Load the policy, size the pool, bind, and start accepting.
    pub async fn start(config: ServerConfig) -> Result<Self, ServerError> {
        tracing::info!(
            address = %config.bind_address(),
            max_workers = config.pool.max_workers,
            keep_alive_secs = config.pool.keep_alive_secs,
            "Initializing socket policy server"
        );

        let store = Arc::new(PolicyStore::new());
        store.load(config.policy.file.as_deref());

        let pool = WorkerPool::from_config(&config.pool);

        let acceptor = Acceptor::bind(&config.bind_address()).await?;
        let local_addr = acceptor.local_addr();
        let acceptor_state = acceptor.state();

        let shutdown = Shutdown::new();
        let acceptor = tokio::spawn(acceptor.run(
            pool.clone(),
            Arc::clone(&store),
            config.timeouts.read_timeout(),
            shutdown.subscribe(),
        ));

        Ok(Self {
            config,
            local_addr,
            store,
            pool,
            shutdown,
            acceptor_state,
            acceptor,
        })
    }

    /// Stop accepting, close the listening socket, and wait for in-flight
    /// connections to finish.
    pub async fn stop(self) {
        tracing::info!(address = %self.local_addr, "Stopping socket policy server");
        self.shutdown.trigger();

        if let Err(e) = self.acceptor.await {
            tracing::error!(error = %e, "Acceptor task failed");
        }
        self.pool.shutdown().await;

        tracing::info!(address = %self.local_addr, "Socket policy server stopped");
    }

    /// Re-read the configured policy source. A failed read keeps the
    /// current document. Connections already being served are unaffected.
    pub fn reload_policy(&self) -> Arc<PolicyDocument> {
        tracing::info!("Reloading policy");
        self.store.load(self.config.policy.file.as_deref())
    }

    /// Address the acceptor is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Snapshot of the document new connections receive.
    pub fn policy(&self) -> Arc<PolicyDocument> {
        self.store.current()
    }

    pub fn acceptor_state(&self) -> AcceptorState {
        *self.acceptor_state.borrow()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("acceptor_state", &self.acceptor_state())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
