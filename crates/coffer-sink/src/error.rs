//! Sink-local error type, folded into [`coffer_core::Error`] at the
//! storage boundary.

use thiserror::Error;

/// Errors raised while writing to or finalizing a storage sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination already exists; a sink never overwrites a prior
    /// artifact of the same name.
    #[error("destination already exists: {0}")]
    AlreadyExists(String),

    /// A retryable remote-storage call exhausted its retry budget.
    #[error("upload to {destination} failed after {attempts} attempts: {cause}")]
    RetriesExhausted { destination: String, attempts: u32, cause: String },

    /// Any other I/O or remote-storage failure.
    #[error("sink I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            SinkError::AlreadyExists(e.to_string())
        } else {
            SinkError::Io(e.to_string())
        }
    }
}

impl From<SinkError> for coffer_core::Error {
    fn from(e: SinkError) -> Self {
        coffer_core::Error::SinkIoError(e.to_string())
    }
}
