//! Holder of the active policy document.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::policy::document::{load_policy_document, PolicyDocument};

/// The currently served policy document.
///
/// Readers take an `Arc` snapshot; a load replaces the whole document
/// atomically, so a connection that already holds a snapshot keeps serving it.
#[derive(Debug)]
pub struct PolicyStore {
    current: ArcSwap<PolicyDocument>,
}

impl PolicyStore {
    /// Create a store serving the built-in default.
    pub fn new() -> Self {
        Self::with_document(PolicyDocument::default())
    }

    pub fn with_document(document: PolicyDocument) -> Self {
        Self {
            current: ArcSwap::from_pointee(document),
        }
    }

    /// Make `path` (or the built-in default when `None`) the active document.
    ///
    /// A file that cannot be read leaves the previous document in place.
    /// Returns whichever document is active afterwards.
    pub fn load(&self, path: Option<&Path>) -> Arc<PolicyDocument> {
        match path {
            None => {
                let document = Arc::new(PolicyDocument::default());
                tracing::info!(
                    policy = %String::from_utf8_lossy(document.body()),
                    "Using default policy"
                );
                self.current.store(Arc::clone(&document));
                document
            }
            Some(path) => match load_policy_document(path) {
                Ok(document) => {
                    let document = Arc::new(document);
                    tracing::info!(
                        path = %path.display(),
                        bytes = document.len(),
                        "Using policy file"
                    );
                    self.current.store(Arc::clone(&document));
                    document
                }
                Err(e) => {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Unable to read policy file, keeping current policy"
                    );
                    self.current()
                }
            },
        }
    }

    /// Snapshot of the active document.
    pub fn current(&self) -> Arc<PolicyDocument> {
        self.current.load_full()
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
