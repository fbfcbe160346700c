//! Directory-relative path keys.
//!
//! A [`RelPath`] is the key used everywhere outside the scanner: it lets
//! the fingerprint database and the archive member names survive the base
//! directory being moved to a different location on disk.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A filesystem-relative name in canonical form: forward slashes, never
/// beginning with a separator. The base directory itself is stored
/// separately (and is absolute) by whoever holds a `RelPath`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelPath(String);

impl RelPath {
    /// Build a `RelPath` from an absolute `path` known to live under `base`.
    ///
    /// Panics if `path` is not a descendant of `base` — this is a
    /// programmer error in every caller (the scanner only ever builds
    /// `RelPath`s for entries it discovered under `base`).
    pub fn from_absolute(base: &Path, path: &Path) -> Self {
        let stripped =
            path.strip_prefix(base).expect("path must be a descendant of base");
        Self::from_relative(stripped)
    }

    /// Build a `RelPath` directly from an already-relative path, canonicalizing
    /// its separators to forward slashes.
    pub fn from_relative(rel: &Path) -> Self {
        let mut s = String::new();
        for (i, component) in rel.components().enumerate() {
            if i > 0 {
                s.push('/');
            }
            s.push_str(&component.as_os_str().to_string_lossy());
        }
        Self(s)
    }

    /// Borrow the canonical string form (forward-slash separated).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this relative path against `base` to produce an absolute path.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        base.join(&self.0)
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RelPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_base_and_uses_forward_slashes() {
        let base = Path::new("/tmp/base");
        let path = Path::new("/tmp/base/sub/dir/file.txt");
        let rel = RelPath::from_absolute(base, path);
        assert_eq!(rel.as_str(), "sub/dir/file.txt");
    }

    #[test]
    fn resolve_roundtrips() {
        let base = Path::new("/tmp/base");
        let rel = RelPath::from_relative(Path::new("a/b.txt"));
        assert_eq!(rel.resolve(base), PathBuf::from("/tmp/base/a/b.txt"));
    }

    #[test]
    fn ordering_is_lexical_on_the_canonical_string() {
        let a = RelPath::from_relative(Path::new("a.txt"));
        let b = RelPath::from_relative(Path::new("b.txt"));
        assert!(a < b);
    }
}
