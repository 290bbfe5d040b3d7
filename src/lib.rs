//! Socket Policy Server Library
//!
//! Answers `<policy-file-request/>\0` on a raw TCP socket with a
//! NUL-terminated cross-domain policy document.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod policy;
pub mod pool;
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use lifecycle::Shutdown;
pub use policy::{PolicyDocument, PolicyStore};
pub use pool::WorkerPool;
pub use server::Server;
