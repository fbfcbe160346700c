//! Storage sink abstraction for the finished, encrypted archive: either a
//! plain local file or a multipart upload to S3.

#![deny(unsafe_code)]

pub mod error;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

pub use error::SinkError;
pub use local::LocalSink;
#[cfg(feature = "s3")]
pub use s3::S3Sink;

/// A destination an encrypted archive can be streamed to.
///
/// The split between [`Sink::open_writer`] and [`Sink::commit`]/
/// [`Sink::abort`] exists so a failed pipeline can discard a
/// partially-written artifact instead of leaving a corrupt file or an
/// orphaned multipart upload behind.
pub trait Sink {
    /// The `std::io::Write` implementation the pipeline's encrypt stage
    /// writes into.
    type Writer: std::io::Write;

    /// Open the destination for writing. Must fail if an artifact of the
    /// same name already exists — a sink never overwrites a prior run's
    /// output.
    fn open_writer(&mut self) -> Result<Self::Writer, SinkError>;

    /// Finalize a fully-written artifact.
    fn commit(self, writer: Self::Writer) -> Result<(), SinkError>;

    /// Discard a partially-written artifact after a pipeline failure.
    fn abort(self, writer: Self::Writer) -> Result<(), SinkError>;
}
