//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the policy server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Well-known port for socket policy requests.
pub const DEFAULT_PORT: u16 = 843;

/// Root configuration for the policy server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Policy document source.
    pub policy: PolicyConfig,

    /// Worker pool sizing.
    pub pool: PoolConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Address string the acceptor binds, e.g. `"0.0.0.0:843"`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listener.host, self.listener.port)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to bind.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Where the served policy document comes from.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Custom policy document. `None` serves the built-in default.
    pub file: Option<PathBuf>,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on concurrently running connection handlers.
    pub max_workers: usize,

    /// Seconds an idle surplus worker waits for work before retiring.
    pub keep_alive_secs: u64,

    /// Cap on connections waiting for a worker. `None` means unbounded.
    pub max_pending: Option<usize>,
}

impl PoolConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            keep_alive_secs: 60,
            max_pending: None,
        }
    }
}

/// Timeout configuration for connection handling.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-read timeout in seconds. `None` waits on the client indefinitely.
    pub read_secs: Option<u64>,
}

impl TimeoutConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_secs.map(Duration::from_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
