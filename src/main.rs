//! Socket Policy Server
//!
//! Serves cross-domain socket policy documents to plugin clients that speak
//! raw TCP.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                 ┌──────────────────────────────────────────────┐
//!     ───────────────────────┼─▶ acceptor ──▶ worker pool ──▶ handler       │
//!     <policy-file-request/> │   (listener)   (max_workers)   (read/classify)│
//!                            │                                    │          │
//!     ◀──────────────────────┼──────────── policy document ◀──────┘          │
//!     (or echoed input)      │                                               │
//!                            │   policy store (Arc snapshot, SIGHUP reload)   │
//!                            └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use socket_policy_server::config::{loader, validate_config, ServerConfig};
use socket_policy_server::lifecycle::{Signal, Signals};
use socket_policy_server::observability::init_logging;
use socket_policy_server::Server;

#[derive(Parser)]
#[command(name = "socket-policy-server")]
#[command(about = "Serves socket policy files on a raw TCP port", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (default 843)
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind (default 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Custom policy document; the built-in permissive policy is served otherwise
    #[arg(long)]
    policy_file: Option<PathBuf>,

    /// Maximum concurrent connection handlers
    #[arg(long)]
    max_workers: Option<usize>,

    /// Seconds before an idle surplus worker retires
    #[arg(long)]
    keep_alive_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, loader::ConfigError> {
        let mut config = match &self.config {
            Some(path) => loader::read_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(host) = self.host {
            config.listener.host = host;
        }
        if let Some(path) = self.policy_file {
            config.policy.file = Some(path);
        }
        if let Some(max_workers) = self.max_workers {
            config.pool.max_workers = max_workers;
        }
        if let Some(secs) = self.keep_alive_secs {
            config.pool.keep_alive_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(loader::ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("socket-policy-server: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.observability.log_level) {
        eprintln!("socket-policy-server: failed to initialize logging: {}", e);
    }

    tracing::info!("socket-policy-server v{} starting", env!("CARGO_PKG_VERSION"));

    let mut signals = match Signals::install() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::start(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Could not start server");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(address = %server.local_addr(), "Socket policy server ready");

    loop {
        match signals.recv().await {
            Signal::Reload => {
                server.reload_policy();
            }
            Signal::Terminate => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    server.stop().await;
    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
