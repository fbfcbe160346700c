//! The archive framer: streams a set of files into a tar body over a
//! non-seekable `Write`, harvesting each file's content print from the
//! exact bytes written rather than a separate pass.

use std::collections::BTreeMap;
use std::io::Write;

use coffer_core::{Error, RelPath};
use coffer_scan::FileEntry;
use tar::{Builder, Header};
use tracing::debug;

use crate::error::PipelineError;

/// Stream `members` (in the order given — callers should pass a
/// deterministic, lexically sorted set) into a tar archive written to
/// `sink`, recording each file's content print along the way.
///
/// Returns once every member has been appended and the archive has been
/// finished (the two trailing 512-byte zero blocks written).
pub fn write_archive<W: Write>(
    sink: W,
    members: &[RelPath],
    files: &BTreeMap<RelPath, FileEntry>,
) -> Result<(), PipelineError> {
    let mut builder = Builder::new(sink);

    for rel in members {
        let entry = files.get(rel).expect("archive member must be present in the inventory");
        let stat = entry.stat_snapshot().map_err(pipeline_io_error)?;

        let mut header = Header::new_gnu();
        header.set_mode(stat.mode & 0o7777);
        header.set_uid(u64::from(stat.uid));
        header.set_gid(u64::from(stat.gid));
        header.set_mtime(stat.mtime.max(0) as u64);
        header.set_size(if stat.is_regular_file() { stat.size } else { 0 });

        if stat.is_symlink() {
            let target = std::fs::read_link(&entry.path).map_err(PipelineError::Io)?;
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_cksum();
            builder
                .append_link(&mut header, rel.as_str(), &target)
                .map_err(PipelineError::Io)?;
            continue;
        }

        let mut reader = entry.open_read().map_err(pipeline_io_error)?;
        header.set_cksum();
        let declared_size = stat.size;
        builder
            .append_data(&mut header, rel.as_str(), &mut reader)
            .map_err(PipelineError::Io)?;

        let streamed = reader.bytes_read();
        if streamed != declared_size {
            return Err(PipelineError::ArchiveSizeMismatch {
                path: rel.to_string(),
                recorded: declared_size,
                streamed,
            });
        }
        entry.record_content_print_from_reader(reader).map_err(pipeline_io_error)?;
        debug!(path = %rel, bytes = streamed, "archived file");
    }

    builder.into_inner().map_err(PipelineError::Io)?;
    Ok(())
}

fn pipeline_io_error(e: Error) -> PipelineError {
    match e {
        Error::Io(io) => PipelineError::Io(io),
        other => PipelineError::Io(std::io::Error::new(std::io::ErrorKind::Other, other)),
    }
}
