use thiserror::Error;

/// Errors that stop the policy server from starting.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening port could not be bound (in use, no privilege).
    #[error("could not listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
