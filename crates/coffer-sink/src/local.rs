//! A sink that writes to a plain local file, refusing to clobber an
//! existing artifact — the Rust equivalent of opening with
//! `O_CREAT | O_WRONLY | O_EXCL`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SinkError;
use crate::Sink;

/// Writes directly to `path`, created exclusively on [`LocalSink::open_writer`].
pub struct LocalSink {
    path: PathBuf,
    opened: bool,
}

impl LocalSink {
    /// A sink targeting `path`. Nothing touches the filesystem until
    /// [`Sink::open_writer`] is called.
    pub fn new(path: PathBuf) -> Self {
        Self { path, opened: false }
    }
}

impl Sink for LocalSink {
    type Writer = File;

    fn open_writer(&mut self) -> Result<Self::Writer, SinkError> {
        let file = std::fs::OpenOptions::new().write(true).create_new(true).open(&self.path)?;
        self.opened = true;
        Ok(file)
    }

    fn commit(self, mut writer: Self::Writer) -> Result<(), SinkError> {
        writer.flush()?;
        writer.sync_all()?;
        info!(path = %self.path.display(), "committed local archive");
        Ok(())
    }

    fn abort(self, writer: Self::Writer) -> Result<(), SinkError> {
        drop(writer);
        if self.opened {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// The filesystem path a [`LocalSink`] targets, exposed for callers that
/// need to name the artifact (e.g. to log it) without owning the sink.
pub fn path_of(sink: &LocalSink) -> &Path {
    &sink.path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn refuses_to_overwrite_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar.xz.mob");
        std::fs::write(&path, b"already here").unwrap();

        let mut sink = LocalSink::new(path);
        let err = sink.open_writer().unwrap_err();
        assert!(matches!(err, SinkError::AlreadyExists(_)));
    }

    #[test]
    fn commit_leaves_the_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar.xz.mob");
        let mut sink = LocalSink::new(path.clone());
        let mut w = sink.open_writer().unwrap();
        w.write_all(b"payload").unwrap();
        sink.commit(w).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn abort_removes_the_partially_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar.xz.mob");
        let mut sink = LocalSink::new(path.clone());
        let w = sink.open_writer().unwrap();
        sink.abort(w).unwrap();
        assert!(!path.exists());
    }
}
