//! Canonical stat-snapshot serialization, the input to `meta_print`.

use std::os::unix::fs::MetadataExt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A 20-byte SHA-1 digest, used for the `meta_print` (and, for regular
/// files, the `content_print`).
pub type Sha1Digest = [u8; 20];

/// `st_mode` format mask (`S_IFMT`).
const S_IFMT: u32 = 0o170000;
/// `st_mode` regular-file bits (`S_IFREG`).
const S_IFREG: u32 = 0o100000;
/// `st_mode` symlink bits (`S_IFLNK`).
const S_IFLNK: u32 = 0o120000;

/// The stat fields captured once per [`crate::relpath::RelPath`] via a
/// single `lstat`. Field order here must match the canonical
/// serialization exactly, or fingerprint databases from prior runs are
/// silently invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub mode: u32,
    pub ino: u64,
    pub dev: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl StatSnapshot {
    /// Capture a snapshot from an already-obtained `lstat` result.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            mode: meta.mode(),
            ino: meta.ino(),
            dev: meta.dev(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.size(),
            atime: meta.atime(),
            mtime: meta.mtime(),
            ctime: meta.ctime(),
        }
    }

    /// Render the canonical ASCII stat string:
    /// `st_mode st_ino st_dev st_nlink st_uid st_gid st_size st_atime st_mtime st_ctime`.
    pub fn canonical_string(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {} {} {}",
            self.mode,
            self.ino,
            self.dev,
            self.nlink,
            self.uid,
            self.gid,
            self.size,
            self.atime,
            self.mtime,
            self.ctime,
        )
    }

    /// The `meta_print`: SHA-1 over [`Self::canonical_string`].
    pub fn meta_print(&self) -> Sha1Digest {
        let mut hasher = Sha1::new();
        hasher.update(self.canonical_string().as_bytes());
        hasher.finalize().into()
    }

    /// Whether this snapshot describes a regular file.
    pub fn is_regular_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    /// Whether this snapshot describes a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_string_field_order() {
        let s = StatSnapshot {
            mode: 1,
            ino: 2,
            dev: 3,
            nlink: 4,
            uid: 5,
            gid: 6,
            size: 7,
            atime: 8,
            mtime: 9,
            ctime: 10,
        };
        assert_eq!(s.canonical_string(), "1 2 3 4 5 6 7 8 9 10");
    }

    #[test]
    fn meta_print_is_deterministic() {
        let s = StatSnapshot {
            mode: 0o100644,
            ino: 42,
            dev: 1,
            nlink: 1,
            uid: 1000,
            gid: 1000,
            size: 6,
            atime: 0,
            mtime: 0,
            ctime: 0,
        };
        assert_eq!(s.meta_print(), s.meta_print());
    }

    #[test]
    fn file_type_bits_are_classified() {
        let mut s = StatSnapshot {
            mode: S_IFREG | 0o644,
            ino: 1,
            dev: 1,
            nlink: 1,
            uid: 0,
            gid: 0,
            size: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        };
        assert!(s.is_regular_file());
        assert!(!s.is_symlink());
        s.mode = S_IFLNK | 0o777;
        assert!(s.is_symlink());
        assert!(!s.is_regular_file());
    }
}
