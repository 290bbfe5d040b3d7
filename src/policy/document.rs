//! The NUL-terminated policy payload and the file reader that produces it.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Built-in policy: any domain may open sockets to any port.
pub const DEFAULT_POLICY: &str = "<cross-domain-policy><site-control permitted-cross-domain-policies=\"master-only\"/><allow-access-from domain=\"*\" to-ports=\"*\" /></cross-domain-policy>\0";

/// Wire terminator that follows every policy document.
pub const TERMINATOR: u8 = 0;

/// An immutable policy document, always ending in exactly one appended NUL.
#[derive(Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    bytes: Box<[u8]>,
}

impl PolicyDocument {
    /// Build a document from file text: line breaks are dropped and the
    /// terminator is appended.
    pub fn from_text(text: &str) -> Self {
        Self::from_raw(text.as_bytes())
    }

    /// Like [`from_text`](Self::from_text), but the content is taken as-is
    /// with no encoding requirement.
    pub fn from_raw(raw: &[u8]) -> Self {
        let mut bytes: Vec<u8> = raw
            .iter()
            .copied()
            .filter(|b| *b != b'\n' && *b != b'\r')
            .collect();
        bytes.push(TERMINATOR);
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Full wire bytes, terminator included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Document body without the trailing terminator.
    pub fn body(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Never true: the terminator is always present.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self {
            bytes: DEFAULT_POLICY.as_bytes().into(),
        }
    }
}

impl fmt::Debug for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyDocument")
            .field("body", &String::from_utf8_lossy(self.body()))
            .field("len", &self.len())
            .finish()
    }
}

/// Read a policy document from disk.
///
/// The file's lines are concatenated. Its bytes are served unchanged
/// otherwise, whatever their encoding.
pub fn load_policy_document(path: &Path) -> io::Result<PolicyDocument> {
    let raw = fs::read(path)?;
    Ok(PolicyDocument::from_raw(&raw))
}
