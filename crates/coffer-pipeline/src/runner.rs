//! Wires the tar, compress and encrypt stages into independent threads
//! connected by bounded byte-chunk conduits, so a large tree streams
//! through the pipeline without ever buffering a whole file (let alone a
//! whole archive) in memory.
//!
//! Each conduit is a `crossbeam_channel::bounded` channel of `Vec<u8>`
//! chunks. [`ChannelWriter`] sends non-empty chunks and a trailing empty
//! chunk on drop to signal EOF; [`ChannelReader`] surfaces that as a
//! normal `Read` EOF. A stage that errors or panics drops its sender,
//! which the next stage observes as a broken pipe rather than a silent
//! hang.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::thread;

use coffer_core::{Error, RelPath};
use coffer_scan::FileEntry;
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{error, info_span};

use crate::compress::compressing_writer_at_level;
use crate::crypto::EncryptingWriter;
use crate::error::PipelineError;
use crate::tar_writer::write_archive;

/// Number of in-flight chunks a conduit may buffer before the sending
/// stage blocks — the only flow-control knob in the pipeline.
const CHANNEL_DEPTH: usize = 4;

/// The write end of a channel conduit, implementing `std::io::Write`.
struct ChannelWriter {
    tx: Option<Sender<Vec<u8>>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .as_ref()
            .expect("tx present for the lifetime of a live ChannelWriter")
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "downstream stage gone"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Vec::new());
        }
    }
}

/// The read end of a channel conduit, implementing `std::io::Read`.
struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pending_pos: usize,
    eof: bool,
}

impl ChannelReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx, pending: Vec::new(), pending_pos: 0, eof: false }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        if self.pending_pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) if chunk.is_empty() => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pending_pos = 0;
                }
                Err(_) => {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "upstream stage gone"));
                }
            }
        }
        let n = buf.len().min(self.pending.len() - self.pending_pos);
        buf[..n].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
        self.pending_pos += n;
        Ok(n)
    }
}

fn conduit() -> (ChannelWriter, ChannelReader) {
    let (tx, rx) = bounded(CHANNEL_DEPTH);
    (ChannelWriter { tx: Some(tx) }, ChannelReader::new(rx))
}

/// What the archive stage needs: the ordered member list and the
/// inventory it was drawn from.
pub struct PipelineSource<'a> {
    pub members: Vec<RelPath>,
    pub files: &'a BTreeMap<RelPath, FileEntry>,
}

/// Run the full tar → compress → encrypt pipeline, writing the final
/// encrypted bytes to `sink`. Each stage runs on its own thread; this
/// function blocks until all three join, translating the first stage
/// failure encountered into a [`coffer_core::Error::PipelineStageFailed`].
pub fn run_pipeline<W: Write + Send>(
    source: PipelineSource<'_>,
    password: &[u8],
    compression_level: u32,
    sink: &mut W,
) -> Result<(), Error> {
    let (tar_to_compress_w, tar_to_compress_r) = conduit();
    let (compress_to_encrypt_w, compress_to_encrypt_r) = conduit();

    let members = &source.members;
    let files = source.files;

    let result = thread::scope(|scope| -> Result<(), PipelineError> {
        let tar_handle = scope.spawn(move || -> Result<(), PipelineError> {
            let _span = info_span!("pipeline_stage", stage = "tar").entered();
            let mut w = tar_to_compress_w;
            write_archive(&mut w, members, files)
        });

        let compress_handle = scope.spawn(move || -> Result<(), PipelineError> {
            let _span = info_span!("pipeline_stage", stage = "compress").entered();
            let mut r = tar_to_compress_r;
            let mut w = compressing_writer_at_level(compress_to_encrypt_w, compression_level);
            io::copy(&mut r, &mut w).map_err(PipelineError::Io)?;
            w.finish().map_err(PipelineError::Io)?;
            Ok(())
        });

        let encrypt_handle = scope.spawn(|| -> Result<(), PipelineError> {
            let _span = info_span!("pipeline_stage", stage = "encrypt").entered();
            let mut r = compress_to_encrypt_r;
            let mut enc = EncryptingWriter::new(sink, password)?;
            io::copy(&mut r, &mut enc).map_err(PipelineError::Io)?;
            enc.flush().map_err(PipelineError::Io)?;
            Ok(())
        });

        let tar_result = tar_handle.join().expect("tar stage thread panicked");
        let compress_result = compress_handle.join().expect("compress stage thread panicked");
        let encrypt_result = encrypt_handle.join().expect("encrypt stage thread panicked");

        if let Err(ref e) = tar_result {
            error!(stage = "tar", error = %e, "pipeline stage failed");
        }
        if let Err(ref e) = compress_result {
            error!(stage = "compress", error = %e, "pipeline stage failed");
        }
        if let Err(ref e) = encrypt_result {
            error!(stage = "encrypt", error = %e, "pipeline stage failed");
        }

        tar_result?;
        compress_result?;
        encrypt_result?;
        Ok(())
    });

    result.map_err(|e| Error::PipelineStageFailed { stage: "tar|compress|encrypt", cause: Box::new(e) })
}

/// Compress and encrypt `payload` in one pass, for small non-tar
/// artifacts (the metadata index) that don't warrant a dedicated thread
/// per stage.
pub fn write_compressed_encrypted<W: Write>(
    payload: &[u8],
    password: &[u8],
    compression_level: u32,
    sink: &mut W,
) -> Result<(), Error> {
    (|| -> Result<(), PipelineError> {
        let mut enc = EncryptingWriter::new(sink, password)?;
        let mut comp = compressing_writer_at_level(&mut enc, compression_level);
        comp.write_all(payload).map_err(PipelineError::Io)?;
        comp.finish().map_err(PipelineError::Io)?;
        enc.flush().map_err(PipelineError::Io)?;
        Ok(())
    })()
    .map_err(|e| Error::PipelineStageFailed { stage: "metadata-index", cause: Box::new(e) })
}

#[cfg(test)]
mod tests {
    use super::*;

    // End-to-end pipeline round trips live in tests/end_to_end_scenarios.rs;
    // these stay here because they reach into the conduit internals that
    // an external test can't name.

    #[test]
    fn conduit_write_after_reader_drop_surfaces_as_broken_pipe() {
        let (mut w, r) = conduit();
        drop(r);
        let err = w.write(b"anything").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn conduit_read_after_writer_drop_without_eof_marker_surfaces_as_broken_pipe() {
        let (mut w, mut r) = conduit();
        // Drop the sender's inner channel handle directly so no trailing
        // empty EOF chunk is ever sent, simulating a stage that panics
        // before its `ChannelWriter` can run its `Drop` impl.
        drop(w.tx.take());
        let mut buf = [0u8; 8];
        let err = r.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn conduit_carries_chunks_to_eof() {
        let (mut w, mut r) = conduit();
        w.write_all(b"hello").unwrap();
        drop(w);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
    }
}
