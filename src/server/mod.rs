//! Server composition: policy store, worker pool and acceptor behind
//! `start` / `stop`.

pub mod policy_server;

pub use policy_server::Server;
