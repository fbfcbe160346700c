//! Pipeline-local error type, folded into [`coffer_core::Error`] at the
//! stage boundary.

use thiserror::Error;

/// Errors raised inside a single pipeline stage (tar framing, compression,
/// encryption, or a conduit read/write).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The tar member's declared size didn't match the number of bytes
    /// actually streamed into the archive body.
    #[error("archive size mismatch for {path}: recorded {recorded}, streamed {streamed}")]
    ArchiveSizeMismatch { path: String, recorded: u64, streamed: u64 },

    /// An encrypted envelope's magic header didn't match what this build
    /// writes, or a compressed stream failed to decode.
    #[error("unsupported or corrupt envelope format")]
    UnsupportedFormat,

    /// Propagated failure from the tar, compression or encryption layer.
    #[error("pipeline I/O error")]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for coffer_core::Error {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::ArchiveSizeMismatch { path, recorded, streamed } => {
                coffer_core::Error::ArchiveSizeMismatch { path, recorded, streamed }
            }
            PipelineError::UnsupportedFormat => coffer_core::Error::UnsupportedFormat,
            PipelineError::Io(e) => coffer_core::Error::Io(e),
        }
    }
}
