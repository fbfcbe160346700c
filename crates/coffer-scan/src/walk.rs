//! Directory scanner: walks the base directory once and materializes the
//! file/directory inventory. No hashing happens here — `lstat` itself is
//! deferred to first use on each [`FileEntry`].

use std::collections::BTreeMap;
use std::path::Path;

use coffer_core::RelPath;
use tracing::warn;
use walkdir::WalkDir;

use crate::entry::{DirEntry, FileEntry};

/// The file/directory inventory produced by a single scan of `base`.
pub struct Inventory {
    /// Every regular file or symlink found below `base`, keyed by its
    /// relative path.
    pub files: BTreeMap<RelPath, FileEntry>,
    /// Every directory found below `base` (including `base` itself),
    /// keyed by its relative path (`""` for the base directory).
    pub dirs: BTreeMap<RelPath, DirEntry>,
}

/// Walk `base` once, in lexical order (so tar member order is
/// reproducible run to run), skipping anything that is not a directory,
/// regular file, or symlink.
pub fn scan(base: &Path) -> Inventory {
    let mut files = BTreeMap::new();
    let mut dirs: BTreeMap<RelPath, DirEntry> = BTreeMap::new();

    for entry in WalkDir::new(base).sort_by_file_name().into_iter() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "failed to walk directory entry");
                continue;
            }
        };

        let path = entry.path();
        let rel = RelPath::from_absolute(base, path);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            dirs.entry(rel.clone()).or_insert_with(|| DirEntry { rel, children: Vec::new() });
            continue;
        }

        if file_type.is_file() || file_type.is_symlink() {
            let parent_rel = path
                .parent()
                .map(|p| RelPath::from_absolute(base, p))
                .unwrap_or_else(|| RelPath::from_relative(Path::new("")));
            dirs.entry(parent_rel.clone())
                .or_insert_with(|| DirEntry { rel: parent_rel, children: Vec::new() })
                .children
                .push(rel.clone());
            files.insert(rel.clone(), FileEntry::new(path.to_path_buf(), rel));
            continue;
        }

        warn!(path = %rel, "skipping unsupported file type (device, socket or fifo)");
    }

    Inventory { files, dirs }
}
