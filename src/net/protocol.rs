//! Socket policy wire protocol.
//!
//! A client opens a connection and sends the 23-byte request below. The server
//! answers with the NUL-terminated policy document. Anything else is echoed.

/// The only request the server understands, NUL included.
pub const EXPECTED_REQUEST: &[u8; 23] = b"<policy-file-request/>\0";

/// Size of the per-connection read buffer.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Classification of one chunk read from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
    /// Exactly the policy file request.
    PolicyRequest,
    /// Anything else; echoed back verbatim.
    Unrecognized(&'a [u8]),
}

/// Classify a single read. Only a read of exactly the request length whose
/// bytes equal the request counts; a request split across reads, or followed
/// by extra bytes in the same read, does not.
pub fn classify(chunk: &[u8]) -> Message<'_> {
    if chunk == EXPECTED_REQUEST {
        Message::PolicyRequest
    } else {
        Message::Unrecognized(chunk)
    }
}
