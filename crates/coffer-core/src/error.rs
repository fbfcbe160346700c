//! The workspace-wide error hierarchy.
//!
//! Each crate is free to return its own narrower error where that aids
//! callers (see `coffer-sink::SinkError`), but every such error converts
//! into this one at the point the driver needs to report or branch on it.

use thiserror::Error;

/// Errors surfaced across the scan, fingerprint, pipeline and sink crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Scanner encountered a non-regular, non-symlink entry.
    #[error("unsupported file type at {path}")]
    UnsupportedFileType {
        /// The path that could not be hashed.
        path: String,
    },

    /// Decryption saw a magic other than `mob1`.
    #[error("unsupported envelope format (bad magic)")]
    UnsupportedFormat,

    /// Structural failure reading the fingerprint blob.
    #[error("corrupt fingerprint database: {0}")]
    CorruptDatabase(String),

    /// Hashing stream wrapper was asked for a digest before reaching EOF.
    #[error("content print requested before EOF latch for {path}")]
    PartialReadHashMismatch {
        /// The path whose digest was requested early.
        path: String,
    },

    /// Bytes streamed into the tar body did not match the recorded size.
    #[error("archive size mismatch for {path}: recorded {recorded}, streamed {streamed}")]
    ArchiveSizeMismatch {
        /// The archive member whose body length disagreed with its stat.
        path: String,
        /// Size recorded in the stat snapshot.
        recorded: u64,
        /// Bytes actually streamed into the tar body.
        streamed: u64,
    },

    /// A pipeline stage terminated abnormally.
    #[error("pipeline stage '{stage}' failed: {cause}")]
    PipelineStageFailed {
        /// The stage's label (e.g. "tar", "compress", "encrypt", "sink").
        stage: &'static str,
        /// The underlying cause.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Local file create/exclusive collision, or remote upload exhausted retries.
    #[error("storage sink io error: {0}")]
    SinkIoError(String),

    /// Generic I/O failure not covered by a more specific variant above.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
