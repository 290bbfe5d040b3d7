//! Worker pool subsystem.
//!
//! # Data Flow
//! ```text
//! acceptor submits connection job
//!     → handed to an idle worker, or new worker spawned (up to max_workers)
//!     → otherwise queued (optionally capped by max_pending)
//!     → rejected when shut down or saturated (job dropped, socket closed)
//! ```

pub mod worker_pool;

pub use worker_pool::{Job, SubmitError, WorkerPool};
