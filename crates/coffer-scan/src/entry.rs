//! File and directory entries materialized by the scanner.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use coffer_core::stat::Sha1Digest;
use coffer_core::{Error, RelPath, StatSnapshot};
use once_cell::sync::OnceCell;
use sha1::{Digest, Sha1};
use tracing::warn;

use crate::hashing::HashingReader;

/// Streaming read buffer size used when hashing a file's full contents.
const HASH_BUF_SIZE: usize = 4 * 1024 * 1024;

/// A regular file or symlink discovered below the scan base.
///
/// `meta_print`, `filesize` and `content_print` are each derived from a
/// single `lstat` and computed at most once; callers that stream a file's
/// body through [`FileEntry::open_read`] can harvest the content digest
/// without a second pass over the bytes.
#[derive(Debug)]
pub struct FileEntry {
    /// Absolute location on disk.
    pub path: PathBuf,
    /// Key used everywhere outside the scanner.
    pub rel: RelPath,
    stat: OnceCell<StatSnapshot>,
    content_print: OnceCell<Vec<u8>>,
}

impl FileEntry {
    /// Construct an entry for `path` (absolute) known to live at `rel`
    /// relative to the scan base. The `lstat` is deferred to first use.
    pub fn new(path: PathBuf, rel: RelPath) -> Self {
        Self { path, rel, stat: OnceCell::new(), content_print: OnceCell::new() }
    }

    /// The stat snapshot, lstat'd and cached on first access.
    pub fn stat_snapshot(&self) -> Result<StatSnapshot, Error> {
        self.stat
            .get_or_try_init(|| {
                std::fs::symlink_metadata(&self.path).map(|m| StatSnapshot::from_metadata(&m))
            })
            .copied()
            .map_err(Error::from)
    }

    /// SHA-1 over the canonical stat string; pure function of the stat
    /// snapshot, memoized alongside it.
    pub fn meta_print(&self) -> Result<Sha1Digest, Error> {
        Ok(self.stat_snapshot()?.meta_print())
    }

    /// Byte length of a regular file, or 0 for symlinks.
    pub fn filesize(&self) -> Result<u64, Error> {
        let snap = self.stat_snapshot()?;
        Ok(if snap.is_regular_file() { snap.size } else { 0 })
    }

    /// The content print: empty for symlinks, SHA-1 of the bytes for
    /// regular files, `UnsupportedFileType` for anything else.
    ///
    /// If a prior call to [`Self::open_read`] fully drained its reader and
    /// the caller harvested the digest via
    /// [`Self::record_content_print_from_reader`], that cached digest is
    /// returned without touching the filesystem again.
    pub fn content_print(&self) -> Result<Vec<u8>, Error> {
        if let Some(d) = self.content_print.get() {
            return Ok(d.clone());
        }
        let snap = self.stat_snapshot()?;
        if snap.is_symlink() {
            let _ = self.content_print.set(Vec::new());
            return Ok(Vec::new());
        }
        if !snap.is_regular_file() {
            return Err(Error::UnsupportedFileType { path: self.rel.to_string() });
        }

        let digest = hash_file_contents(&self.path, snap.size)?;
        let _ = self.content_print.set(digest.to_vec());
        Ok(digest.to_vec())
    }

    /// Open this entry's path through the hashing stream wrapper, for
    /// callers (the archive framer) that want to stream the body and
    /// derive the content print from the exact bytes they consumed.
    pub fn open_read(&self) -> Result<HashingReader<BufReader<File>>, Error> {
        let file = File::open(&self.path)?;
        Ok(HashingReader::new(BufReader::with_capacity(HASH_BUF_SIZE, file)))
    }

    /// Harvest the digest from a reader previously returned by
    /// [`Self::open_read`] that has been read to EOF, caching it as this
    /// entry's content print.
    ///
    /// Per §4.1, asking for the digest before the EOF latch is a contract
    /// violation: this falls back to an independent reopen + rehash so the
    /// archive-write path always ends up with a correct content print.
    pub fn record_content_print_from_reader(
        &self,
        reader: HashingReader<BufReader<File>>,
    ) -> Result<(), Error> {
        match reader.finalize() {
            Some(digest) => {
                let _ = self.content_print.set(digest.to_vec());
                Ok(())
            }
            None => {
                warn!(path = %self.rel, "content digest requested before EOF latch; rehashing");
                let _ = self.content_print()?;
                Ok(())
            }
        }
    }
}

fn hash_file_contents(path: &Path, size: u64) -> Result<Sha1Digest, Error> {
    use std::io::Read;

    let mut hasher = Sha1::new();
    let mut remaining = size;
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        remaining -= n as u64;
    }
    Ok(hasher.finalize().into())
}

/// A directory below the scan base, plus the file entries directly inside
/// it. Directories are never hashed; they exist so empty directories and
/// tar metadata remain reproducible.
#[derive(Debug)]
pub struct DirEntry {
    /// Key used everywhere outside the scanner.
    pub rel: RelPath,
    /// File entries found directly inside this directory.
    pub children: Vec<RelPath>,
}
