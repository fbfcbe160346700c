//! The fingerprint database: a persistent map of relative path →
//! (meta_print, content_print), and the diff engine that partitions a
//! fresh directory scan into new / updated / altered / deleted sets.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use coffer_core::{Error, RelPath};
use coffer_scan::FileEntry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// On-disk representation: exactly two top-level keys, `meta_prints` and
/// `content_prints`, each mapping a `RelPath` string to a byte blob.
#[derive(Debug, Serialize, Deserialize)]
struct DatabaseBlob {
    meta_prints: BTreeMap<String, serde_bytes::ByteBuf>,
    content_prints: BTreeMap<String, serde_bytes::ByteBuf>,
}

/// The fingerprint database: in-memory mapping of `RelPath` to its last
/// recorded meta and content prints, plus the (unpersisted) base path it
/// was built against.
#[derive(Debug, Clone)]
pub struct Database {
    base: PathBuf,
    meta_prints: BTreeMap<RelPath, [u8; 20]>,
    content_prints: BTreeMap<RelPath, Vec<u8>>,
}

impl Database {
    /// A fresh, empty database rooted at `base`.
    pub fn new(base: PathBuf) -> Self {
        Self { base, meta_prints: BTreeMap::new(), content_prints: BTreeMap::new() }
    }

    /// The base directory this database was constructed against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Number of entries currently on record.
    pub fn len(&self) -> usize {
        self.meta_prints.len()
    }

    /// Whether the database holds no entries (the empty-db shortcut case
    /// in [`Self::diff`]).
    pub fn is_empty(&self) -> bool {
        self.meta_prints.is_empty()
    }

    /// Deserialize a database from its on-disk msgpack blob, rooting it at
    /// `base`. Fails with [`Error::CorruptDatabase`] on structural mismatch.
    pub fn load(base: PathBuf, bytes: &[u8]) -> Result<Self, Error> {
        let blob: DatabaseBlob = rmp_serde::from_slice(bytes)
            .map_err(|e| Error::CorruptDatabase(e.to_string()))?;

        if blob.meta_prints.keys().collect::<std::collections::BTreeSet<_>>()
            != blob.content_prints.keys().collect::<std::collections::BTreeSet<_>>()
        {
            return Err(Error::CorruptDatabase(
                "meta_prints and content_prints key sets differ".into(),
            ));
        }

        let mut meta_prints = BTreeMap::new();
        for (k, v) in blob.meta_prints {
            let digest: [u8; 20] = v.into_vec().try_into().map_err(|_| {
                Error::CorruptDatabase(format!("meta_print for {k} is not 20 bytes"))
            })?;
            meta_prints.insert(RelPath::from(k), digest);
        }
        let content_prints = blob
            .content_prints
            .into_iter()
            .map(|(k, v)| (RelPath::from(k), v.into_vec()))
            .collect();

        Ok(Self { base, meta_prints, content_prints })
    }

    /// Load a database from `path` if it exists, or return a fresh empty
    /// one rooted at `base` otherwise.
    pub fn load_or_new(base: PathBuf, path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            debug!(path = %path.display(), "no existing fingerprint database; starting fresh");
            return Ok(Self::new(base));
        }
        let bytes = std::fs::read(path)?;
        Self::load(base, &bytes)
    }

    /// Serialize the current state to its on-disk msgpack form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let blob = DatabaseBlob {
            meta_prints: self
                .meta_prints
                .iter()
                .map(|(k, v)| (k.to_string(), serde_bytes::ByteBuf::from(v.to_vec())))
                .collect(),
            content_prints: self
                .content_prints
                .iter()
                .map(|(k, v)| (k.to_string(), serde_bytes::ByteBuf::from(v.clone())))
                .collect(),
        };
        rmp_serde::to_vec_named(&blob).map_err(|e| Error::CorruptDatabase(e.to_string()))
    }

    /// Write the database to `path` atomically: serialize to a temp file
    /// beside `path`, then rename over it.
    pub fn save_atomic(&self, path: &Path) -> Result<(), Error> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Partition `current_files` into `(new, updated)` against the stored
    /// meta prints. If the database is empty, every file is `new` (the
    /// shortcut that avoids rehashing an entire first-time tree).
    pub fn diff(
        &self,
        current_files: &BTreeMap<RelPath, FileEntry>,
    ) -> Result<(Vec<RelPath>, Vec<RelPath>), Error> {
        if self.meta_prints.is_empty() {
            return Ok((current_files.keys().cloned().collect(), Vec::new()));
        }

        let mut new = Vec::new();
        let mut updated = Vec::new();
        for (rel, entry) in current_files {
            match self.meta_prints.get(rel) {
                None => new.push(rel.clone()),
                Some(stored) => {
                    if *stored != entry.meta_print()? {
                        updated.push(rel.clone());
                    }
                }
            }
        }
        Ok((new, updated))
    }

    /// Keys present in the stored table but absent from `current_files`.
    pub fn deletions(&self, current_files: &BTreeMap<RelPath, FileEntry>) -> Vec<RelPath> {
        self.meta_prints.keys().filter(|rel| !current_files.contains_key(*rel)).cloned().collect()
    }

    /// Among `updated_set`, the subset whose content actually changed
    /// (recomputing `content_print` from bytes). `progress`, if given, is
    /// invoked with cumulative bytes inspected after each file.
    pub fn altered(
        &self,
        updated_set: &[RelPath],
        current_files: &BTreeMap<RelPath, FileEntry>,
        mut progress: Option<&mut dyn FnMut(u64)>,
    ) -> Result<Vec<RelPath>, Error> {
        let mut altered = Vec::new();
        let mut n_bytes: u64 = 0;
        for rel in updated_set {
            let entry = current_files
                .get(rel)
                .expect("updated_set must only contain keys present in current_files");
            let fresh = entry.content_print()?;
            if self.content_prints.get(rel).map(|stored| stored != &fresh).unwrap_or(true) {
                altered.push(rel.clone());
            }
            if let Some(cb) = progress.as_deref_mut() {
                n_bytes += entry.filesize()?;
                cb(n_bytes);
            }
        }
        Ok(altered)
    }

    /// Sum of filesizes over `fileset` (progress-bar maxima, and the
    /// sink's multipart-vs-single-put decision).
    pub fn sizes_of(
        &self,
        fileset: &[RelPath],
        current_files: &BTreeMap<RelPath, FileEntry>,
    ) -> Result<u64, Error> {
        let mut total = 0u64;
        for rel in fileset {
            total += current_files
                .get(rel)
                .expect("fileset must only contain keys present in current_files")
                .filesize()?;
        }
        Ok(total)
    }

    /// Rebuild both stored tables from `current_files`: meta prints are
    /// always refreshed; content prints are carried over unchanged when
    /// the meta print didn't change, and re-derived otherwise.
    pub fn update_meta(&mut self, current_files: &BTreeMap<RelPath, FileEntry>) -> Result<(), Error> {
        let mut new_meta = BTreeMap::new();
        let mut new_content = BTreeMap::new();

        for (rel, entry) in current_files {
            let meta = entry.meta_print()?;
            new_meta.insert(rel.clone(), meta);

            let carried_over = self
                .meta_prints
                .get(rel)
                .filter(|stored| **stored == meta)
                .and_then(|_| self.content_prints.get(rel))
                .cloned();

            let content = match carried_over {
                Some(c) => c,
                None => entry.content_print()?,
            };
            new_content.insert(rel.clone(), content);
        }

        self.meta_prints = new_meta;
        self.content_prints = new_content;
        Ok(())
    }
}
