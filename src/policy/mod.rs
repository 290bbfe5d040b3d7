//! Policy document subsystem.
//!
//! # Data Flow
//! ```text
//! policy file (optional)
//!     → document.rs (read text, strip line breaks, append NUL)
//!     → store.rs (atomic swap of Arc<PolicyDocument>)
//!     → snapshot handed to each connection at accept time
//! ```
//!
//! # Design Decisions
//! - Documents are immutable; loading swaps the whole document
//! - A failed load keeps the previous document, never the server down
//! - The built-in default is used whenever no file is configured

pub mod document;
pub mod store;

pub use document::{load_policy_document, PolicyDocument, DEFAULT_POLICY};
pub use store::PolicyStore;
